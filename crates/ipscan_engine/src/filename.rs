use chrono::NaiveDate;
use ipscan_core::JobHandle;

const MAX_STEM_LEN: usize = 64;

/// Export file name safe on every platform: `{prefix}_{stem}.{ext}`.
pub fn export_filename(prefix: &str, stem: &str, ext: &str) -> String {
    let prefix = sanitize(prefix, "export");
    let stem = sanitize(stem, "results");
    let ext = ext.trim_start_matches('.');
    let name = format!("{prefix}_{stem}");
    if ext.is_empty() {
        name
    } else {
        format!("{name}.{ext}")
    }
}

/// Short job tag for file names: the first 8 characters of the job id.
pub fn job_stem(job: &JobHandle) -> String {
    job.as_str().chars().take(8).collect()
}

pub fn date_stem(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today_stem() -> String {
    date_stem(chrono::Local::now().date_naive())
}

fn sanitize(input: &str, fallback: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let mut cleaned: String = compacted
        .trim_matches(&['_', '.'][..])
        .chars()
        .take(MAX_STEM_LEN)
        .collect();
    if cleaned.is_empty() {
        cleaned = fallback.to_string();
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_and_date_stems() {
        let job = JobHandle::new("1a2b3c4d-5e6f-7081-92a3-b4c5d6e7f809");
        assert_eq!(
            export_filename("ip_analysis", &job_stem(&job), "csv"),
            "ip_analysis_1a2b3c4d.csv"
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            export_filename("ip_analysis", &date_stem(date), ".json"),
            "ip_analysis_2024-01-01.json"
        );
    }

    #[test]
    fn forbidden_characters_are_collapsed() {
        assert_eq!(
            export_filename("scan", "a/b:: c?", "csv"),
            "scan_a_b_c.csv"
        );
        assert_eq!(export_filename("", "...", "csv"), "export_results.csv");
    }

    #[test]
    fn short_job_ids_are_kept_whole() {
        assert_eq!(job_stem(&JobHandle::new("abc")), "abc");
    }
}
