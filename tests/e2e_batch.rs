mod support;

use std::future::Future;
use std::net::TcpListener;
use std::sync::Arc;

use apimon::args::PositiveUsize;
use apimon::batch::{BatchRunner, StatusBucket};
use apimon::http::{BearerToken, MANIFEST_FIELD, ReqwestDispatcher, RequestSpec, build_client};
use tempfile::tempdir;

use support::spawn_http_server_or_skip;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn runner() -> Result<BatchRunner, String> {
    let client = build_client(None).map_err(|err| format!("client: {}", err))?;
    Ok(BatchRunner::new(Arc::new(ReqwestDispatcher::new(client))))
}

fn concurrency(value: usize) -> Result<PositiveUsize, String> {
    PositiveUsize::try_from(value).map_err(|err| format!("concurrency: {}", err))
}

#[test]
fn e2e_batch_buckets_real_statuses() -> Result<(), String> {
    let Some((url, server)) = spawn_http_server_or_skip(&[200, 500, 503, 504, 429, 200])? else {
        return Ok(());
    };
    run_async_test(async move {
        let spec = Arc::new(RequestSpec::get(format!("{}/v1/storage/assets/tables", url)));
        let result = runner()?
            .run_batch(&spec, concurrency(6)?)
            .await
            .map_err(|err| format!("batch failed: {}", err))?;

        let histogram = result.histogram();
        let expected = [
            (StatusBucket::Ok, 2),
            (StatusBucket::InternalServerError, 1),
            (StatusBucket::ServiceUnavailable, 1),
            (StatusBucket::GatewayTimeout, 1),
            (StatusBucket::Other, 1),
        ];
        for (bucket, count) in expected {
            if histogram.count(bucket) != count {
                return Err(format!(
                    "bucket {} expected {}, got {}",
                    bucket.label(),
                    count,
                    histogram.count(bucket)
                ));
            }
        }
        let requests = server.requests()?;
        if requests.len() != 6 {
            return Err(format!("server saw {} requests", requests.len()));
        }
        Ok(())
    })
}

#[test]
fn e2e_manifest_upload_is_multipart_with_query_and_token() -> Result<(), String> {
    let Some((url, server)) = spawn_http_server_or_skip(&[200])? else {
        return Ok(());
    };
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let manifest = dir.path().join("synapse_storage_manifest_patient.csv");
    std::fs::write(&manifest, "Patient ID,Sex\nP1,Female\n")
        .map_err(|err| format!("write manifest failed: {}", err))?;

    run_async_test(async move {
        let token = BearerToken::new("e2e-token").map_err(|err| format!("token: {}", err))?;
        let spec = Arc::new(
            RequestSpec::post_manifest(format!("{}/v1/model/validate", url), &manifest)
                .with_param("data_type", "Patient")
                .with_param("restrict_rules", false)
                .with_bearer(Some(token)),
        );
        runner()?
            .run_batch(&spec, concurrency(1)?)
            .await
            .map_err(|err| format!("batch failed: {}", err))?;

        let requests = server.requests()?;
        let request = requests.first().ok_or("no request captured")?;
        let line = request.request_line();
        if !line.starts_with("POST /v1/model/validate?") {
            return Err(format!("unexpected request line: {}", line));
        }
        if !line.contains("data_type=Patient") || !line.contains("restrict_rules=False") {
            return Err(format!("query params missing: {}", line));
        }
        if request.header("authorization") != Some("Bearer e2e-token") {
            return Err(format!("missing bearer header: {}", request.head));
        }
        let content_type = request.header("content-type").unwrap_or_default();
        if !content_type.starts_with("multipart/form-data") {
            return Err(format!("unexpected content type: {}", content_type));
        }
        let body = request.body_text();
        if !body.contains(&format!("name=\"{}\"", MANIFEST_FIELD)) {
            return Err(format!("manifest part missing: {}", body));
        }
        if !body.contains("filename=\"synapse_storage_manifest_patient.csv\"")
            || !body.contains("P1,Female")
        {
            return Err(format!("manifest content missing: {}", body));
        }
        Ok(())
    })
}

#[test]
fn e2e_list_params_repeat_the_key() -> Result<(), String> {
    let Some((url, server)) = spawn_http_server_or_skip(&[200])? else {
        return Ok(());
    };
    run_async_test(async move {
        let spec = Arc::new(
            RequestSpec::get(format!("{}/v1/storage/dataset/files", url))
                .with_param("file_names", vec!["a.csv".to_owned(), "b.csv".to_owned()]),
        );
        runner()?
            .run_batch(&spec, concurrency(1)?)
            .await
            .map_err(|err| format!("batch failed: {}", err))?;

        let requests = server.requests()?;
        let line = requests.first().ok_or("no request captured")?.request_line();
        if !line.contains("file_names=a.csv&file_names=b.csv") {
            return Err(format!("list not repeated: {}", line));
        }
        Ok(())
    })
}

#[test]
fn e2e_refused_connection_fails_the_batch() -> Result<(), String> {
    let port = {
        let listener = match TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return Ok(()),
            Err(err) => return Err(format!("bind failed: {}", err)),
        };
        listener
            .local_addr()
            .map_err(|err| format!("addr failed: {}", err))?
            .port()
    };
    run_async_test(async move {
        let spec = Arc::new(RequestSpec::get(format!("http://127.0.0.1:{}/v1", port)));
        match runner()?.run_batch(&spec, concurrency(3)?).await {
            Err(err) if err.is_transport() => Ok(()),
            Err(err) => Err(format!("expected transport error, got {}", err)),
            Ok(result) => Err(format!("expected failure, got {:?}", result)),
        }
    })
}
