//! End-to-end tests: stub capability clients, the real engine, and a
//! temporary output directory.

use awsinv::aws::{AwsClient, RemoteError, Request};
use awsinv::collectors::{self, ClientProvider, CollectContext, Collector};
use awsinv::engine::{
    CollectEngine, CollectError, ExecutorRegistry, Paginator, PrefixTruncationExpander,
};
use awsinv::store::AtomicFile;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =============================================================================
// Stubs
// =============================================================================

const QUEUE_URL: &str = "https://sqs.eu-west-1.amazonaws.com/123456789012/";

#[derive(Default)]
struct StubClients {
    deny_queue_attributes: bool,
    requested: Mutex<Vec<(String, String)>>,
}

impl ClientProvider for StubClients {
    fn client(&self, service: &str, region: &str) -> AwsClient {
        self.requested
            .lock()
            .unwrap()
            .push((service.to_string(), region.to_string()));
        match service {
            "sqs" => sqs_stub(region, self.deny_queue_attributes),
            "s3" => s3_stub(region),
            _ => AwsClient::builder(service, region).build(),
        }
    }
}

fn sqs_stub(region: &str, deny_attributes: bool) -> AwsClient {
    AwsClient::builder("sqs", region)
        .operation("listQueues", |req: Request| async move {
            let prefix = req.get("QueueNamePrefix").and_then(Value::as_str).unwrap_or("");
            let urls: Vec<String> = ["alpha", "beta", "gamma"]
                .iter()
                .filter(|n| n.starts_with(prefix))
                .map(|n| format!("{}{}", QUEUE_URL, n))
                .collect();
            Ok(json!({ "QueueUrls": urls }))
        })
        .operation("getQueueAttributes", move |req: Request| async move {
            if deny_attributes {
                return Err(RemoteError::new("AccessDenied", "not allowed").with_status(403));
            }
            let url = req.get("QueueUrl").and_then(Value::as_str).unwrap_or("").to_string();
            Ok(json!({
                "Attributes": {
                    "QueueArn": format!("arn:aws:sqs:eu-west-1:123456789012:{}", url.rsplit('/').next().unwrap_or("")),
                    "Policy": "{\"Version\":\"2012-10-17\",\"Statement\":[]}",
                    "VisibilityTimeout": "30",
                }
            }))
        })
        .build()
}

fn s3_stub(region: &str) -> AwsClient {
    fn bucket(req: &Request) -> String {
        req.get("Bucket").and_then(Value::as_str).unwrap_or("").to_string()
    }

    AwsClient::builder("s3", region)
        .operation("listBuckets", |_req: Request| async {
            Ok(json!({
                "Buckets": [
                    {"Name": "b2", "CreationDate": "2020-01-01T00:00:00Z"},
                    {"Name": "a1", "CreationDate": "2019-01-01T00:00:00Z"},
                ],
                "Owner": {"DisplayName": "me", "ID": "abc"},
                "ResponseMetadata": {"RequestId": "r-1"},
            }))
        })
        .operation("getBucketLocation", |req: Request| async move {
            let location = if bucket(&req) == "a1" { json!("EU") } else { Value::Null };
            Ok(json!({ "LocationConstraint": location }))
        })
        .operation("getBucketAcl", |_req: Request| async {
            Ok(json!({
                "Owner": {"DisplayName": "me", "ID": "abc"},
                "Grants": [
                    {"Grantee": {"ID": "abc", "Type": "CanonicalUser"}, "Permission": "WRITE"},
                    {"Grantee": {"ID": "abc", "Type": "CanonicalUser"}, "Permission": "FULL_CONTROL"},
                ],
            }))
        })
        .operation("getBucketCors", |req: Request| async move {
            if bucket(&req) == "a1" {
                Ok(json!({ "CORSRules": [{"AllowedMethods": ["GET"], "AllowedOrigins": ["*"]}] }))
            } else {
                Err(RemoteError::new("NoSuchCORSConfiguration", "none").with_status(404))
            }
        })
        .operation("getBucketLifecycleConfiguration", |req: Request| async move {
            if bucket(&req) == "a1" {
                Ok(json!({ "Rules": [
                    {"ID": "expire", "Prefix": "tmp/", "Status": "Enabled"},
                    {"ID": "archive", "Prefix": "logs/", "Status": "Disabled"},
                ] }))
            } else {
                Err(RemoteError::new("NoSuchLifecycleConfiguration", "none").with_status(404))
            }
        })
        .operation("getBucketLogging", |_req: Request| async {
            Ok(json!({ "LoggingEnabled": {"TargetBucket": "logs", "TargetPrefix": "s3/"} }))
        })
        .operation("getBucketNotificationConfiguration", |_req: Request| async {
            Ok(json!({
                "TopicConfigurations": [],
                "QueueConfigurations": [],
                "LambdaFunctionConfigurations": [],
            }))
        })
        .operation("getBucketRequestPayment", |_req: Request| async {
            Ok(json!({ "Payer": "BucketOwner" }))
        })
        .operation("getBucketPolicy", |req: Request| async move {
            if bucket(&req) == "a1" {
                Ok(json!({ "Policy": "{\"Statement\":[{\"Effect\":\"Allow\"}]}" }))
            } else {
                Err(RemoteError::new("NoSuchBucketPolicy", "none").with_status(404))
            }
        })
        .operation("getBucketTagging", |_req: Request| async {
            Ok(json!({ "TagSet": [{"Key": "team", "Value": "x"}, {"Key": "App", "Value": "y"}] }))
        })
        .operation("getBucketVersioning", |_req: Request| async {
            Ok(json!({ "Status": "Enabled" }))
        })
        .build()
}

fn context(root: &Path, clients: Arc<StubClients>) -> CollectContext {
    CollectContext {
        engine: CollectEngine::new(Arc::new(ExecutorRegistry::with_concurrency(3).unwrap())),
        store: AtomicFile::new(root),
        clients,
        region_patterns: vec!["eu-west-1".to_string()],
    }
}

fn read_json(path: impl AsRef<Path>) -> Value {
    let text = std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("{:?}: {}", path.as_ref(), e));
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Collectors
// =============================================================================

#[tokio::test]
async fn test_collectors_write_snapshot_tree() {
    let dir = tempfile::tempdir().unwrap();
    let clients = Arc::new(StubClients::default());
    let ctx = context(dir.path(), clients.clone());

    let results = collectors::run_all(&ctx, Collector::ALL).await;
    for (collector, result) in &results {
        assert!(result.is_ok(), "{} failed: {:?}", collector.name(), result);
    }

    let sqs = dir.path().join("service/sqs/region/eu-west-1");
    assert_eq!(
        read_json(sqs.join("list-all-queues.json"))["QueueUrls"],
        json!([
            format!("{}alpha", QUEUE_URL),
            format!("{}beta", QUEUE_URL),
            format!("{}gamma", QUEUE_URL),
        ])
    );
    assert_eq!(
        std::fs::read_to_string(sqs.join("list-all-queues.txt")).unwrap(),
        "alpha\nbeta\ngamma\n"
    );
    let attrs = read_json(sqs.join("queue/beta/attributes.json"));
    assert_eq!(attrs["Policy"], json!({"Version": "2012-10-17", "Statement": []}));
    assert_eq!(attrs["QueueArn"], "arn:aws:sqs:eu-west-1:123456789012:beta");

    let s3 = dir.path().join("service/s3");
    assert_eq!(
        read_json(s3.join("list-buckets.json")),
        json!({
            "Buckets": [
                {"Name": "a1", "CreationDate": "2019-01-01T00:00:00Z"},
                {"Name": "b2", "CreationDate": "2020-01-01T00:00:00Z"},
            ],
            "Owner": {"DisplayName": "me", "ID": "abc"},
        })
    );

    let a1 = s3.join("location/eu-west-1/bucket/a1");
    assert_eq!(
        read_json(a1.join("policy.json")),
        json!({"Policy": {"Statement": [{"Effect": "Allow"}]}})
    );
    assert_eq!(read_json(a1.join("tags.json"))["TagSet"][0]["Key"], "App");
    assert_eq!(read_json(a1.join("versioning.json")), json!({"Status": "Enabled"}));
    assert_eq!(read_json(a1.join("acl.json"))["Grants"][0]["Permission"], "FULL_CONTROL");
    assert_eq!(read_json(a1.join("cors.json"))["CORSRules"][0]["AllowedMethods"], json!(["GET"]));
    assert_eq!(read_json(a1.join("lifecycle.json"))["Rules"][0]["ID"], "archive");
    assert_eq!(read_json(a1.join("logging.json"))["LoggingEnabled"]["TargetBucket"], "logs");
    assert_eq!(
        read_json(a1.join("notification-configuration.json"))["TopicConfigurations"],
        json!([])
    );
    assert_eq!(read_json(a1.join("request-payment.json")), json!({"Payer": "BucketOwner"}));

    let b2 = s3.join("location/standard/bucket/b2");
    for asset in [
        "acl.json",
        "logging.json",
        "notification-configuration.json",
        "request-payment.json",
        "tags.json",
        "versioning.json",
    ] {
        assert!(b2.join(asset).is_file(), "missing {}", asset);
    }
    for absent in ["cors.json", "lifecycle.json", "policy.json"] {
        assert!(!b2.join(absent).exists(), "unexpected {}", absent);
    }

    let requested = clients.requested.lock().unwrap().clone();
    assert!(requested.contains(&("s3".to_string(), "eu-west-1".to_string())));
    assert!(requested.contains(&("s3".to_string(), "us-east-1".to_string())));
    assert!(requested.iter().all(|(svc, region)| svc != "sqs" || region == "eu-west-1"));

    // nothing left behind by the atomic writes
    assert!(!sqs.join("list-all-queues.json.tmp").exists());
}

#[tokio::test]
async fn test_failing_collector_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let clients = Arc::new(StubClients {
        deny_queue_attributes: true,
        ..StubClients::default()
    });
    let ctx = context(dir.path(), clients);

    let results = collectors::run_all(&ctx, Collector::ALL).await;

    let sqs = results.iter().find(|(c, _)| *c == Collector::Sqs).unwrap();
    let err = sqs.1.as_ref().unwrap_err();
    assert!(format!("{:#}", err).contains("AccessDenied"));

    let s3 = results.iter().find(|(c, _)| *c == Collector::S3).unwrap();
    assert!(s3.1.is_ok());

    // written before the failure, and kept
    assert!(dir
        .path()
        .join("service/sqs/region/eu-west-1/list-all-queues.json")
        .is_file());
    assert!(dir.path().join("service/s3/list-buckets.json").is_file());
}

// =============================================================================
// Engine
// =============================================================================

#[tokio::test]
async fn test_token_pagination_through_one_slot() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();

    let client = AwsClient::builder("ec2", "eu-west-1")
        .operation("describeThings", move |req: Request| {
            record.lock().unwrap().push(Value::Object(req.clone()));
            async move {
                let page = match req.get("NextToken").and_then(Value::as_str) {
                    None => json!({"Things": [1, 2], "NextToken": "t1", "Page": 1}),
                    Some("t1") => json!({"Things": [3], "NextToken": "t2", "Page": 2}),
                    Some(_) => json!({"Things": [4, 5], "Page": 3}),
                };
                Ok(page)
            }
        })
        .build();

    let registry = Arc::new(ExecutorRegistry::with_concurrency(1).unwrap());
    let engine = CollectEngine::new(registry.clone());
    let paginator = Paginator::new("NextToken", "NextToken", "Things");

    let mut args = Request::new();
    args.insert("Filter".into(), json!("x"));
    let result = engine
        .collect_from_aws(&client, "describeThings", args, Some(&paginator))
        .await
        .unwrap();

    assert_eq!(result, json!({"Things": [1, 2, 3, 4, 5], "Page": 3}));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            json!({"Filter": "x"}),
            json!({"Filter": "x", "NextToken": "t1"}),
            json!({"Filter": "x", "NextToken": "t2"}),
        ]
    );

    let stats = registry.inspect();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].0, "ec2.eu-west-1.amazonaws.com");
    assert_eq!(stats[0].1.queue, 0);
}

#[tokio::test]
async fn test_unpaginated_token_response_is_refused() {
    let client = AwsClient::builder("ec2", "eu-west-1")
        .operation("describeThings", |_req: Request| async {
            Ok(json!({"Things": [1], "NextToken": "more"}))
        })
        .build();
    let engine = CollectEngine::new(Arc::new(ExecutorRegistry::default()));

    let err = engine
        .collect_from_aws(&client, "describeThings", Request::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CollectError::Pagination { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_expanding_2500_names_through_engine() {
    const ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
    let letters: Vec<char> = ALPHABET.chars().collect();

    let mut rng = rand::rngs::StdRng::seed_from_u64(2500);
    let mut universe = BTreeSet::new();
    // one dense cluster so several page boundaries land inside it
    for i in 0..900 {
        universe.insert(format!("prod_worker_{:04}", i));
    }
    while universe.len() < 2500 {
        let len = rng.random_range(1..=10);
        let name: String = (0..len)
            .map(|_| letters[rng.random_range(0..letters.len())])
            .collect();
        universe.insert(name);
    }
    let names: Arc<Vec<String>> = Arc::new(universe.iter().cloned().collect());

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let client = AwsClient::builder("sqs", "eu-west-1")
        .operation("listQueues", move |req: Request| {
            let names = names.clone();
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let prefix = req.get("QueueNamePrefix").and_then(Value::as_str).unwrap_or("");
                let page: Vec<&String> = names
                    .iter()
                    .filter(|n| n.starts_with(prefix))
                    .take(1000)
                    .collect();
                Ok(json!({ "QueueUrls": page }))
            }
        })
        .build();

    let engine = CollectEngine::new(Arc::new(ExecutorRegistry::default()));
    let expander = PrefixTruncationExpander::new(
        move |prefix: String| {
            let engine = engine.clone();
            let client = client.clone();
            async move {
                let mut req = Request::new();
                req.insert("QueueNamePrefix".into(), json!(prefix));
                let response = engine.collect_from_aws(&client, "listQueues", req, None).await?;
                let names: Vec<String> = response["QueueUrls"]
                    .as_array()
                    .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                Ok::<_, CollectError>(names)
            }
        },
        |name: &String| name.clone(),
        ALPHABET,
        1000,
    )
    .unwrap();

    let found = expander.expand("").await.unwrap();

    assert_eq!(found.len(), 2500);
    let unique: BTreeSet<String> = found.into_iter().collect();
    assert_eq!(unique, universe);
    assert!(calls.load(Ordering::SeqCst) > 3);
}
