/// `m:ss` below an hour, `h:mm:ss` from there on.
pub fn format_duration(millis: i64) -> String {
    let seconds = millis.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
    } else {
        format!("{}:{:02}", minutes, seconds % 60)
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters >= 1000. {
        format!("{:.2} km", meters / 1000.)
    } else {
        format!("{:.0} m", meters)
    }
}
