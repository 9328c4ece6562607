//! SDK Dispatch
//!
//! Builds capability-map clients whose operations call the AWS SDK and hand
//! back JSON using the field names of the AWS API reference.

use super::client::{AwsClient, Request};
use super::error::RemoteError;
use aws_config::{BehaviorVersion, SdkConfig};
use serde_json::{json, Map, Value};

/// Load the shared SDK configuration (credentials chain, retries, timeouts)
///
/// The SDK's own retry layer is left at its defaults; throttling that gets
/// past it is handled by the engine.
pub async fn load_sdk_config(profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(profile) = profile {
        tracing::debug!("Using AWS profile {}", profile);
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

// =============================================================================
// SQS
// =============================================================================

/// SQS client for one region
pub fn sqs_client(sdk: &SdkConfig, region: &str) -> AwsClient {
    let conf = aws_sdk_sqs::config::Builder::from(sdk)
        .region(aws_sdk_sqs::config::Region::new(region.to_string()))
        .build();
    let sqs = aws_sdk_sqs::Client::from_conf(conf);

    let list = sqs.clone();
    let attrs = sqs;

    AwsClient::builder("sqs", region)
        .operation("listQueues", move |req| list_queues(list.clone(), req))
        .operation("getQueueAttributes", move |req| {
            get_queue_attributes(attrs.clone(), req)
        })
        .build()
}

async fn list_queues(client: aws_sdk_sqs::Client, req: Request) -> Result<Value, RemoteError> {
    let out = client
        .list_queues()
        .set_queue_name_prefix(get_param_str_opt(&req, "QueueNamePrefix"))
        .set_next_token(get_param_str_opt(&req, "NextToken"))
        .set_max_results(get_param_i32_opt(&req, "MaxResults"))
        .send()
        .await?;

    let mut response = Map::new();
    response.insert("QueueUrls".into(), json!(out.queue_urls()));
    if let Some(token) = out.next_token() {
        response.insert("NextToken".into(), json!(token));
    }
    Ok(Value::Object(response))
}

async fn get_queue_attributes(
    client: aws_sdk_sqs::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    use aws_sdk_sqs::types::QueueAttributeName;

    let url = get_param_str(&req, "QueueUrl")?;
    let names: Vec<QueueAttributeName> = get_param_str_list(&req, "AttributeNames")
        .iter()
        .map(|name| QueueAttributeName::from(name.as_str()))
        .collect();

    let out = client
        .get_queue_attributes()
        .queue_url(url)
        .set_attribute_names(if names.is_empty() { None } else { Some(names) })
        .send()
        .await?;

    let mut attributes = Map::new();
    if let Some(attrs) = out.attributes() {
        for (name, value) in attrs {
            attributes.insert(name.as_str().to_string(), json!(value));
        }
    }
    Ok(json!({ "Attributes": attributes }))
}

// =============================================================================
// S3
// =============================================================================

/// S3 client for one region
pub fn s3_client(sdk: &SdkConfig, region: &str) -> AwsClient {
    let conf = aws_sdk_s3::config::Builder::from(sdk)
        .region(aws_sdk_s3::config::Region::new(region.to_string()))
        .build();
    let s3 = aws_sdk_s3::Client::from_conf(conf);

    let (buckets, location) = (s3.clone(), s3.clone());
    let (acl, cors, lifecycle, logging) = (s3.clone(), s3.clone(), s3.clone(), s3.clone());
    let (notification, policy, payment) = (s3.clone(), s3.clone(), s3.clone());
    let (tagging, versioning) = (s3.clone(), s3);

    AwsClient::builder("s3", region)
        .operation("listBuckets", move |req| list_buckets(buckets.clone(), req))
        .operation("getBucketLocation", move |req| {
            get_bucket_location(location.clone(), req)
        })
        .operation("getBucketAcl", move |req| get_bucket_acl(acl.clone(), req))
        .operation("getBucketCors", move |req| get_bucket_cors(cors.clone(), req))
        .operation("getBucketLifecycleConfiguration", move |req| {
            get_bucket_lifecycle(lifecycle.clone(), req)
        })
        .operation("getBucketLogging", move |req| get_bucket_logging(logging.clone(), req))
        .operation("getBucketNotificationConfiguration", move |req| {
            get_bucket_notification(notification.clone(), req)
        })
        .operation("getBucketPolicy", move |req| get_bucket_policy(policy.clone(), req))
        .operation("getBucketRequestPayment", move |req| {
            get_bucket_request_payment(payment.clone(), req)
        })
        .operation("getBucketTagging", move |req| {
            get_bucket_tagging(tagging.clone(), req)
        })
        .operation("getBucketVersioning", move |req| {
            get_bucket_versioning(versioning.clone(), req)
        })
        .build()
}

async fn list_buckets(client: aws_sdk_s3::Client, req: Request) -> Result<Value, RemoteError> {
    use aws_sdk_s3::primitives::DateTimeFormat;

    let out = client
        .list_buckets()
        .set_continuation_token(get_param_str_opt(&req, "ContinuationToken"))
        .send()
        .await?;

    let buckets: Vec<Value> = out
        .buckets()
        .iter()
        .map(|bucket| {
            let created = bucket
                .creation_date()
                .and_then(|d| d.fmt(DateTimeFormat::DateTime).ok());
            json!({
                "Name": bucket.name(),
                "CreationDate": created,
            })
        })
        .collect();

    let mut response = Map::new();
    response.insert("Buckets".into(), Value::Array(buckets));
    if let Some(owner) = out.owner() {
        response.insert(
            "Owner".into(),
            json!({ "DisplayName": owner.display_name(), "ID": owner.id() }),
        );
    }
    if let Some(token) = out.continuation_token() {
        response.insert("ContinuationToken".into(), json!(token));
    }
    Ok(Value::Object(response))
}

async fn get_bucket_location(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_location().bucket(bucket).send().await?;

    let location = out.location_constraint().map(|c| c.as_str().to_string());
    Ok(json!({ "LocationConstraint": location }))
}

async fn get_bucket_acl(client: aws_sdk_s3::Client, req: Request) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_acl().bucket(bucket).send().await?;

    let grants: Vec<Value> = out
        .grants()
        .iter()
        .map(|grant| {
            let grantee = grant.grantee().map(|g| {
                json!({
                    "DisplayName": g.display_name(),
                    "EmailAddress": g.email_address(),
                    "ID": g.id(),
                    "Type": g.r#type().as_str(),
                    "URI": g.uri(),
                })
            });
            json!({
                "Grantee": grantee,
                "Permission": grant.permission().map(|p| p.as_str()),
            })
        })
        .collect();

    let mut response = Map::new();
    response.insert("Grants".into(), Value::Array(grants));
    if let Some(owner) = out.owner() {
        response.insert(
            "Owner".into(),
            json!({ "DisplayName": owner.display_name(), "ID": owner.id() }),
        );
    }
    Ok(Value::Object(response))
}

async fn get_bucket_cors(client: aws_sdk_s3::Client, req: Request) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_cors().bucket(bucket).send().await?;

    let rules: Vec<Value> = out
        .cors_rules()
        .iter()
        .map(|rule| {
            json!({
                "ID": rule.id(),
                "AllowedHeaders": rule.allowed_headers(),
                "AllowedMethods": rule.allowed_methods(),
                "AllowedOrigins": rule.allowed_origins(),
                "ExposeHeaders": rule.expose_headers(),
                "MaxAgeSeconds": rule.max_age_seconds(),
            })
        })
        .collect();
    Ok(json!({ "CORSRules": rules }))
}

#[allow(deprecated)]
async fn get_bucket_lifecycle(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client
        .get_bucket_lifecycle_configuration()
        .bucket(bucket)
        .send()
        .await?;

    let rules: Vec<Value> = out
        .rules()
        .iter()
        .map(|rule| {
            let mut entry = Map::new();
            entry.insert("ID".into(), json!(rule.id()));
            entry.insert("Prefix".into(), json!(rule.prefix()));
            entry.insert("Status".into(), json!(rule.status().as_str()));
            if let Some(expiration) = rule.expiration() {
                entry.insert(
                    "Expiration".into(),
                    json!({
                        "Days": expiration.days(),
                        "ExpiredObjectDeleteMarker": expiration.expired_object_delete_marker(),
                    }),
                );
            }
            if let Some(noncurrent) = rule.noncurrent_version_expiration() {
                entry.insert(
                    "NoncurrentVersionExpiration".into(),
                    json!({ "NoncurrentDays": noncurrent.noncurrent_days() }),
                );
            }
            if let Some(abort) = rule.abort_incomplete_multipart_upload() {
                entry.insert(
                    "AbortIncompleteMultipartUpload".into(),
                    json!({ "DaysAfterInitiation": abort.days_after_initiation() }),
                );
            }
            Value::Object(entry)
        })
        .collect();
    Ok(json!({ "Rules": rules }))
}

async fn get_bucket_logging(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_logging().bucket(bucket).send().await?;

    let mut response = Map::new();
    if let Some(logging) = out.logging_enabled() {
        response.insert(
            "LoggingEnabled".into(),
            json!({
                "TargetBucket": logging.target_bucket(),
                "TargetPrefix": logging.target_prefix(),
            }),
        );
    }
    Ok(Value::Object(response))
}

async fn get_bucket_notification(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client
        .get_bucket_notification_configuration()
        .bucket(bucket)
        .send()
        .await?;

    let events = |list: &[aws_sdk_s3::types::Event]| -> Vec<String> {
        list.iter().map(|e| e.as_str().to_string()).collect()
    };

    let topics: Vec<Value> = out
        .topic_configurations()
        .iter()
        .map(|c| json!({ "Id": c.id(), "TopicArn": c.topic_arn(), "Events": events(c.events()) }))
        .collect();
    let queues: Vec<Value> = out
        .queue_configurations()
        .iter()
        .map(|c| json!({ "Id": c.id(), "QueueArn": c.queue_arn(), "Events": events(c.events()) }))
        .collect();
    let lambdas: Vec<Value> = out
        .lambda_function_configurations()
        .iter()
        .map(|c| {
            json!({
                "Id": c.id(),
                "LambdaFunctionArn": c.lambda_function_arn(),
                "Events": events(c.events()),
            })
        })
        .collect();

    Ok(json!({
        "TopicConfigurations": topics,
        "QueueConfigurations": queues,
        "LambdaFunctionConfigurations": lambdas,
    }))
}

async fn get_bucket_request_payment(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_request_payment().bucket(bucket).send().await?;
    Ok(json!({ "Payer": out.payer().map(|p| p.as_str()) }))
}

async fn get_bucket_versioning(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_versioning().bucket(bucket).send().await?;

    let mut response = Map::new();
    if let Some(status) = out.status() {
        response.insert("Status".into(), json!(status.as_str()));
    }
    if let Some(mfa) = out.mfa_delete() {
        response.insert("MFADelete".into(), json!(mfa.as_str()));
    }
    Ok(Value::Object(response))
}

async fn get_bucket_policy(client: aws_sdk_s3::Client, req: Request) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_policy().bucket(bucket).send().await?;
    Ok(json!({ "Policy": out.policy() }))
}

async fn get_bucket_tagging(
    client: aws_sdk_s3::Client,
    req: Request,
) -> Result<Value, RemoteError> {
    let bucket = get_param_str(&req, "Bucket")?;
    let out = client.get_bucket_tagging().bucket(bucket).send().await?;

    let tags: Vec<Value> = out
        .tag_set()
        .iter()
        .map(|tag| json!({ "Key": tag.key(), "Value": tag.value() }))
        .collect();
    Ok(json!({ "TagSet": tags }))
}

// =============================================================================
// Helpers
// =============================================================================

fn get_param_str(req: &Request, key: &str) -> Result<String, RemoteError> {
    get_param_str_opt(req, key)
        .ok_or_else(|| RemoteError::new("MissingParameter", format!("Missing parameter: {}", key)))
}

fn get_param_str_opt(req: &Request, key: &str) -> Option<String> {
    req.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_param_i32_opt(req: &Request, key: &str) -> Option<i32> {
    req.get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn get_param_str_list(req: &Request, key: &str) -> Vec<String> {
    req.get(key)
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
