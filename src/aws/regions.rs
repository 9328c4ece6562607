//! Regions per service
//!
//! A static table, filtered by the user's region patterns.

const COMMERCIAL: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

/// Region S3 uses for global calls and for buckets with no location
pub const S3_HOME_REGION: &str = "us-east-1";

/// Every region `service` is offered in; empty for unknown services
pub fn regions_for_service(service: &str) -> &'static [&'static str] {
    match service {
        "sqs" => COMMERCIAL,
        "s3" => &[S3_HOME_REGION],
        _ => &[],
    }
}

/// Keep regions containing any of `patterns`; no patterns keeps everything
pub fn filter_regions<'a>(regions: &[&'a str], patterns: &[String]) -> Vec<&'a str> {
    regions
        .iter()
        .copied()
        .filter(|region| patterns.is_empty() || patterns.iter().any(|p| region.contains(p.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        assert!(regions_for_service("sqs").contains(&"eu-west-1"));
        assert_eq!(regions_for_service("s3"), &["us-east-1"]);
        assert!(regions_for_service("nope").is_empty());
    }

    #[test]
    fn test_filter() {
        let all = regions_for_service("sqs");
        assert_eq!(filter_regions(all, &[]).len(), all.len());

        let eu = filter_regions(all, &["eu-west".to_string()]);
        assert_eq!(eu, vec!["eu-west-1", "eu-west-2", "eu-west-3"]);

        let mixed = filter_regions(all, &["sa-".to_string(), "us-west-2".to_string()]);
        assert_eq!(mixed, vec!["sa-east-1", "us-west-2"]);
    }
}
