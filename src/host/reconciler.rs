//! Release reconciliation between known and freshly fetched releases

use std::collections::HashSet;

use crate::host::types::Release;

/// Returns the fetched releases whose version is not among the known releases
///
/// The result keeps the order of `fetched`. A version listed more than once
/// in `fetched` is reported only once, at its first position.
pub fn diff(known: &[Release], fetched: &[Release]) -> Vec<Release> {
    let mut seen: HashSet<&str> = known.iter().map(|r| r.version.as_str()).collect();

    fetched
        .iter()
        .filter(|release| seen.insert(release.version.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::types::{HostType, ProjectKey};
    use chrono::Utc;
    use rstest::rstest;

    fn releases(versions: &[&str]) -> Vec<Release> {
        let now = Utc::now();
        versions
            .iter()
            .map(|v| Release {
                version: v.to_string(),
                url: format!("https://www.npmjs.com/package/lodash/v/{}", v),
                published_at: now,
                project: ProjectKey::new(HostType::Npm, "lodash"),
            })
            .collect()
    }

    fn versions(releases: &[Release]) -> Vec<&str> {
        releases.iter().map(|r| r.version.as_str()).collect()
    }

    #[rstest]
    #[case(vec![], vec![], vec![])]
    #[case(vec![], vec!["1.0.0", "1.1.0"], vec!["1.0.0", "1.1.0"])]
    #[case(vec!["1.0.0"], vec!["1.0.0", "1.1.0", "2.0.0"], vec!["1.1.0", "2.0.0"])]
    #[case(vec!["1.0.0", "1.1.0"], vec!["1.0.0", "1.1.0"], vec![])]
    #[case(vec!["1.0.0"], vec![], vec![])]
    #[case(vec!["1.0.0"], vec!["2.0.0", "0.9.0", "1.5.0"], vec!["2.0.0", "0.9.0", "1.5.0"])]
    #[case(vec!["1.0.0"], vec!["1.0.0", "2.0.0", "1.0.0", "2.0.0"], vec!["2.0.0"])]
    #[case(vec!["v1.0.0"], vec!["1.0.0", "v1.0.0"], vec!["1.0.0"])]
    fn diff_returns_fetched_minus_known_in_fetched_order(
        #[case] known: Vec<&str>,
        #[case] fetched: Vec<&str>,
        #[case] expected: Vec<&str>,
    ) {
        let result = diff(&releases(&known), &releases(&fetched));

        assert_eq!(versions(&result), expected);
    }

    #[test]
    fn diff_keeps_fetched_release_metadata() {
        let known = releases(&["1.0.0"]);
        let mut fetched = releases(&["1.0.0", "1.1.0"]);
        fetched[1].url = "https://example.com/1.1.0".to_string();

        let result = diff(&known, &fetched);

        assert_eq!(result, vec![fetched[1].clone()]);
    }
}
