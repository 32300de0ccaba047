use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::events::VisibilityWindow;
use crate::scheduler::SatResult;
use crate::snapshot::SatelliteSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

pub fn write_report<W: Write>(
    out: &mut W,
    results: &[SatResult],
    format: ReportFormat,
) -> io::Result<()> {
    match format {
        ReportFormat::Text => write_text(out, results),
        ReportFormat::Json => write_json(out, results),
    }
}

/// One block per satellite with any window; satellites without windows are skipped.
pub fn write_text<W: Write>(out: &mut W, results: &[SatResult]) -> io::Result<()> {
    let names: BTreeMap<usize, &str> = results
        .iter()
        .map(|r| (r.sat_index, r.name.as_str()))
        .collect();

    for result in results.iter().filter(|r| !r.is_empty()) {
        writeln!(out, "==== Satellite #{} ({}) ====", result.sat_index, result.name)?;
        for (station, windows) in &result.ground_stations {
            writeln!(out, "  Ground station {}: {} window(s)", station, windows.len())?;
            write_windows(out, windows)?;
        }
        for (other, windows) in &result.inter_satellite {
            let name = names.get(other).copied().unwrap_or("?");
            writeln!(
                out,
                "  Satellite #{} ({}): {} window(s)",
                other,
                name,
                windows.len()
            )?;
            write_windows(out, windows)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_windows<W: Write>(out: &mut W, windows: &[VisibilityWindow]) -> io::Result<()> {
    for w in windows {
        let end = w.end.map(timestamp).unwrap_or_else(|| "still visible".to_string());
        writeln!(
            out,
            "    {}, {}, duration {:.0} s",
            timestamp(w.start),
            end,
            w.duration_s
        )?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, results: &[SatResult]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)
}

pub fn write_snapshots<W: Write>(
    out: &mut W,
    snapshots: &[SatelliteSnapshot],
    format: ReportFormat,
) -> io::Result<()> {
    if format == ReportFormat::Json {
        serde_json::to_writer_pretty(&mut *out, snapshots)?;
        return writeln!(out);
    }
    for s in snapshots {
        writeln!(
            out,
            "#{} ({}) at {}: lat {:.4}°, lon {:.4}°, alt {:.1} m | rates {:+.6}°/s, {:+.6}°/s, {:+.3} m/s",
            s.sat_index,
            s.name,
            timestamp(s.time),
            s.position.latitude_deg(),
            s.position.longitude_deg(),
            s.position.altitude_m,
            s.latitude_rate_deg_s,
            s.longitude_rate_deg_s,
            s.altitude_rate_m_s
        )?;
    }
    Ok(())
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::shifted_by;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn results() -> Vec<SatResult> {
        let mut first = SatResult::new(0, "alpha");
        first.ground_stations.insert(
            "beijing".to_string(),
            vec![VisibilityWindow {
                start: shifted_by(t0(), 60.0),
                end: Some(shifted_by(t0(), 420.4)),
                duration_s: 360.4,
            }],
        );
        first.inter_satellite.insert(
            2,
            vec![VisibilityWindow {
                start: t0(),
                end: None,
                duration_s: 3600.0,
            }],
        );
        vec![first, SatResult::new(1, "beta"), SatResult::new(2, "gamma")]
    }

    fn render(format: ReportFormat) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, &results(), format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_report_skips_empty_satellites() {
        let text = render(ReportFormat::Text);
        let expected = "\
==== Satellite #0 (alpha) ====
  Ground station beijing: 1 window(s)
    2024-03-01T00:01:00.000Z, 2024-03-01T00:07:00.400Z, duration 360 s
  Satellite #2 (gamma): 1 window(s)
    2024-03-01T00:00:00.000Z, still visible, duration 3600 s

";
        assert_eq!(text, expected);
    }

    #[test]
    fn json_report_marks_open_windows_with_null() {
        let json: serde_json::Value = serde_json::from_str(&render(ReportFormat::Json)).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
        let shared = &json[0]["inter_satellite"]["2"][0];
        assert!(shared["end"].is_null());
        assert_eq!(shared["duration_s"], 3600.0);
        assert_eq!(json[0]["ground_stations"]["beijing"][0]["duration_s"], 360.4);
    }
}
