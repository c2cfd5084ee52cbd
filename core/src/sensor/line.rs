use crate::prelude::{Sample, SonarError, SonarResult};

/// Parses one `angle,distance` line as written by the scanner firmware.
///
/// Blank lines and lines without a comma (status chatter) yield `Ok(None)`.
pub fn parse_reading_line(line: &str) -> SonarResult<Option<Sample>> {
    let line = line.trim();
    let Some((angle, rest)) = line.split_once(',') else {
        return Ok(None);
    };
    let distance = rest.split(',').next().unwrap_or_default().trim();

    let angle: i64 = angle
        .trim()
        .parse()
        .map_err(|_| SonarError::Parse(format!("bad angle in {line:?}")))?;
    let distance: f64 = distance
        .parse()
        .map_err(|_| SonarError::Parse(format!("bad distance in {line:?}")))?;

    let angle = u16::try_from(angle)
        .map_err(|_| SonarError::InvalidSample(format!("angle {angle} outside 0..=180")))?;
    Sample::new(angle, distance).map(Some)
}

pub fn format_reading_line(sample: &Sample) -> String {
    format!("{},{}", sample.angle, sample.distance)
}
