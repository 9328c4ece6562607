//! SQS collector
//!
//! `ListQueues` returns at most 1000 URLs and has no continuation token when
//! called without `MaxResults`, so the full list comes from prefix expansion.

use super::CollectContext;
use crate::aws::{AwsClient, Request};
use crate::engine::{CollectEngine, CollectError, PrefixTruncationExpander};
use crate::resource::decode_json_inline;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde_json::{json, Value};

/// Characters legal in a queue name, in byte order
///
/// `.` only appears in the `.fifo` suffix, but a page can still end there.
pub const QUEUE_NAME_ALPHABET: &str =
    "-.0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Largest page `ListQueues` returns
pub const MAX_RESULTS: usize = 1000;

const ATTRIBUTES: &[&str] = &[
    "Policy",
    "VisibilityTimeout",
    "MaximumMessageSize",
    "MessageRetentionPeriod",
    "CreatedTimestamp",
    "LastModifiedTimestamp",
    "QueueArn",
    "DelaySeconds",
    "ReceiveMessageWaitTimeSeconds",
    "RedrivePolicy",
];

pub async fn collect_all(ctx: &CollectContext) -> Result<()> {
    try_join_all(
        ctx.regions("sqs")
            .into_iter()
            .map(|region| collect_region(ctx, region)),
    )
    .await?;
    Ok(())
}

async fn collect_region(ctx: &CollectContext, region: &str) -> Result<()> {
    let client = ctx.client("sqs", region);
    let base = format!("service/sqs/region/{}", region);

    let urls = list_all_queues(&ctx.engine, &client)
        .await
        .with_context(|| format!("Failed to list SQS queues in {}", region))?;
    tracing::debug!("{} queues in {}", urls.len(), region);

    ctx.store
        .save_json(&format!("{}/list-all-queues.json", base), json!({ "QueueUrls": urls }))
        .await?;

    let names: String = urls.iter().map(|url| format!("{}\n", queue_name(url))).collect();
    let save_names = async {
        ctx.store
            .save_content(&format!("{}/list-all-queues.txt", base), names)
            .await
            .map_err(anyhow::Error::from)
    };
    let save_attrs = try_join_all(
        urls.iter()
            .map(|url| save_queue_attributes(ctx, &client, &base, url)),
    );

    futures::try_join!(save_names, save_attrs)?;
    Ok(())
}

/// Every queue URL visible to `client`, via prefix expansion over `listQueues`
pub async fn list_all_queues(engine: &CollectEngine, client: &AwsClient) -> Result<Vec<String>> {
    let expander = queue_expander(engine.clone(), client.clone())?;
    Ok(expander.expand("").await?)
}

fn queue_expander(
    engine: CollectEngine,
    client: AwsClient,
) -> crate::engine::Result<PrefixTruncationExpander<String>> {
    PrefixTruncationExpander::new(
        move |prefix: String| {
            let engine = engine.clone();
            let client = client.clone();
            async move {
                let mut request = Request::new();
                request.insert("QueueNamePrefix".into(), json!(prefix));
                let response = engine
                    .collect_from_aws(&client, "listQueues", request, None)
                    .await?;
                Ok::<_, CollectError>(string_list(&response, "QueueUrls"))
            }
        },
        |url: &String| queue_name(url).to_string(),
        QUEUE_NAME_ALPHABET,
        MAX_RESULTS,
    )
}

async fn save_queue_attributes(
    ctx: &CollectContext,
    client: &AwsClient,
    base: &str,
    url: &str,
) -> Result<()> {
    let mut request = Request::new();
    request.insert("QueueUrl".into(), json!(url));
    request.insert("AttributeNames".into(), json!(ATTRIBUTES));

    let response = ctx
        .engine
        .collect_from_aws(client, "getQueueAttributes", request, None)
        .await
        .with_context(|| format!("Failed to get attributes of {}", url))?;

    let attributes = response.get("Attributes").cloned().unwrap_or_else(|| json!({}));
    let attributes = decode_json_inline(attributes, "Policy")
        .and_then(|a| decode_json_inline(a, "RedrivePolicy"))
        .with_context(|| format!("Invalid policy JSON on {}", url))?;

    let name = queue_name(url);
    ctx.store
        .save_json(&format!("{}/queue/{}/attributes.json", base, name), attributes)
        .await?;
    Ok(())
}

/// Last path segment of a queue URL
pub fn queue_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn string_list(response: &Value, field: &str) -> Vec<String> {
    response
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
