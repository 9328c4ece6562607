//! S3 collector
//!
//! Buckets are global but their configuration is read from the bucket's own
//! region, so each bucket is visited through a client for its location.

use super::CollectContext;
use crate::aws::regions::S3_HOME_REGION;
use crate::aws::{AwsClient, Request};
use crate::engine::{CollectError, Paginator};
use crate::resource::{decode_json_inline, sort_list_by, str_field, tidy_response_metadata};
use anyhow::{Context, Result};
use futures::future::join_all;
use serde_json::{json, Value};

/// Per-bucket documents: (operation, file name)
const BUCKET_ASSETS: &[(&str, &str)] = &[
    ("getBucketAcl", "acl.json"),
    ("getBucketCors", "cors.json"),
    ("getBucketLifecycleConfiguration", "lifecycle.json"),
    ("getBucketLogging", "logging.json"),
    ("getBucketNotificationConfiguration", "notification-configuration.json"),
    ("getBucketPolicy", "policy.json"),
    ("getBucketRequestPayment", "request-payment.json"),
    ("getBucketTagging", "tags.json"),
    ("getBucketVersioning", "versioning.json"),
];

pub async fn collect_all(ctx: &CollectContext) -> Result<()> {
    let client = ctx.client("s3", S3_HOME_REGION);

    let buckets = list_buckets(ctx, &client).await?;
    let buckets = ctx.store.save_json("service/s3/list-buckets.json", buckets).await?;

    let names: Vec<&str> = buckets
        .get("Buckets")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|b| str_field(b, "Name")).collect())
        .unwrap_or_default();

    let results = join_all(names.iter().map(|name| bucket_details(ctx, &client, name))).await;

    let mut failures = results.into_iter().filter_map(|r| r.err());
    let Some(first) = failures.next() else {
        return Ok(());
    };
    let others = failures.count();
    Err(first.context(format!("{} other bucket(s) also failed", others)))
}

async fn list_buckets(ctx: &CollectContext, client: &AwsClient) -> Result<Value> {
    let paginator = Paginator::new("ContinuationToken", "ContinuationToken", "Buckets");
    let response = ctx
        .engine
        .collect_from_aws(client, "listBuckets", Request::new(), Some(&paginator))
        .await
        .context("Failed to list S3 buckets")?;

    let mut response = tidy_response_metadata(response);
    sort_list_by(&mut response, "Buckets", |b| str_field(b, "Name").to_string());
    Ok(response)
}

async fn bucket_details(ctx: &CollectContext, client: &AwsClient, bucket: &str) -> Result<()> {
    let response = ctx
        .engine
        .collect_from_aws(client, "getBucketLocation", bucket_request(bucket), None)
        .await
        .with_context(|| format!("Failed to get location of bucket {}", bucket))?;

    let location = location_name(response.get("LocationConstraint").and_then(Value::as_str));
    tracing::debug!("location for {} is {}", bucket, location);

    let regional = ctx.client("s3", region_for_location(location));
    let base = format!("service/s3/location/{}/bucket/{}", location, bucket);

    let saves = BUCKET_ASSETS
        .iter()
        .map(|&(operation, file)| save_bucket_asset(ctx, &regional, bucket, operation, &base, file));
    futures::future::try_join_all(saves).await?;
    Ok(())
}

async fn save_bucket_asset(
    ctx: &CollectContext,
    client: &AwsClient,
    bucket: &str,
    operation: &str,
    base: &str,
    file: &str,
) -> Result<()> {
    let response = match ctx
        .engine
        .collect_from_aws(client, operation, bucket_request(bucket), None)
        .await
    {
        Ok(response) => response,
        Err(e) if is_absent(&e) => {
            tracing::debug!("{} {}: nothing to save ({})", operation, bucket, e);
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("{} failed for bucket {}", operation, bucket))
        }
    };

    let data = shape(operation, tidy_response_metadata(response))
        .with_context(|| format!("Invalid {} response for bucket {}", operation, bucket))?;
    ctx.store.save_json(&format!("{}/{}", base, file), data).await?;
    Ok(())
}

fn shape(operation: &str, mut data: Value) -> serde_json::Result<Value> {
    match operation {
        "getBucketAcl" => {
            sort_list_by(&mut data, "Grants", |g| {
                (
                    str_field(&g["Grantee"], "ID").to_string(),
                    str_field(g, "Permission").to_string(),
                )
            });
            Ok(data)
        }
        "getBucketLifecycleConfiguration" => {
            sort_list_by(&mut data, "Rules", |r| {
                (str_field(r, "ID").to_string(), str_field(r, "Prefix").to_string())
            });
            Ok(data)
        }
        "getBucketPolicy" => decode_json_inline(data, "Policy"),
        "getBucketTagging" => {
            sort_list_by(&mut data, "TagSet", |t| str_field(t, "Key").to_lowercase());
            Ok(data)
        }
        _ => Ok(data),
    }
}

fn is_absent(err: &CollectError) -> bool {
    err.remote().map(|e| e.is_not_found()).unwrap_or(false)
}

fn bucket_request(bucket: &str) -> Request {
    let mut request = Request::new();
    request.insert("Bucket".into(), json!(bucket));
    request
}

/// Directory name for a `LocationConstraint`
///
/// Buckets in us-east-1 report no constraint; old EU buckets report `EU`.
pub fn location_name(constraint: Option<&str>) -> &str {
    match constraint {
        None | Some("") => "standard",
        Some("EU") => "eu-west-1",
        Some(other) => other,
    }
}

/// Region whose endpoint serves buckets in `location`
pub fn region_for_location(location: &str) -> &str {
    match location {
        "standard" => S3_HOME_REGION,
        other => other,
    }
}
