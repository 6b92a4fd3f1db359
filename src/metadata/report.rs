use teloxide::utils::html;

use super::MetadataRecord;

/// Renders a record as a Telegram HTML message.
pub fn render_report(record: &MetadataRecord) -> String {
    let mut lines = vec![html::bold("Файл проаналізовано:")];
    lines.push(String::new());
    lines.extend(
        record
            .iter()
            .map(|(name, value)| format!("{}: {}", html::bold(name), html::escape(&value.to_string()))),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldValue;

    #[test]
    fn one_line_per_field_escaped() {
        let record: MetadataRecord = vec![
            ("File name", FieldValue::Text("<cat>.mp4".into())),
            ("Resolution", FieldValue::Dimensions { width: 640, height: 360 }),
        ]
        .into_iter()
        .collect();

        let report = render_report(&record);
        let lines: Vec<_> = report.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "<b>File name</b>: &lt;cat&gt;.mp4");
        assert_eq!(lines[3], "<b>Resolution</b>: 640x360");
    }
}
