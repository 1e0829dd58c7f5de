// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{json, Value};

use super::*;

#[test]
fn request_defaults_to_authenticated_without_bearer() {
    let req = ApiRequest::get("/patients");
    assert_eq!(req.method, Method::Get);
    assert!(req.authenticated);
    assert_eq!(req.bearer, None);
    assert_eq!(req.body, RequestBody::Empty);
}

#[test]
fn builders_accumulate() {
    let req = ApiRequest::post("/auth/logout")
        .json(json!({ "refresh_token": "r-1" }))
        .query("page", "2")
        .header("x-request-id", "abc")
        .bearer(Some("a-1".to_owned()))
        .anonymous();

    assert_eq!(req.method.as_str(), "POST");
    assert_eq!(req.query, vec![("page".to_owned(), "2".to_owned())]);
    assert_eq!(req.headers, vec![("x-request-id".to_owned(), "abc".to_owned())]);
    assert_eq!(req.bearer.as_deref(), Some("a-1"));
    assert!(!req.authenticated);
    assert_eq!(req.body, RequestBody::Json(json!({ "refresh_token": "r-1" })));
}

#[test]
fn file_body_keeps_bytes() {
    let req = ApiRequest::post("/invoices/upload").file(
        "file",
        "march.csv",
        "text/csv",
        b"id,amount\n1,10\n".to_vec(),
    );
    assert_eq!(
        req.body,
        RequestBody::File {
            field: "file".to_owned(),
            file_name: "march.csv".to_owned(),
            content_type: "text/csv".to_owned(),
            bytes: Bytes::from_static(b"id,amount\n1,10\n"),
        }
    );
}

#[yare::parameterized(
    ok           = { 200, true, false },
    created      = { 201, true, false },
    no_content   = { 204, true, false },
    redirect     = { 302, false, false },
    unauthorized = { 401, false, true },
    forbidden    = { 403, false, false },
    server       = { 500, false, false },
)]
fn status_predicates(status: u16, success: bool, unauthorized: bool) {
    let resp = ApiResponse::new(status, "");
    assert_eq!(resp.is_success(), success);
    assert_eq!(resp.is_unauthorized(), unauthorized);
}

#[test]
fn empty_body_decodes_as_null() -> anyhow::Result<()> {
    let resp = ApiResponse::new(204, "");
    assert_eq!(resp.json::<Value>()?, Value::Null);
    assert_eq!(resp.json::<Option<String>>()?, None);
    Ok(())
}

#[test]
fn json_and_text_read_the_body() -> anyhow::Result<()> {
    let resp = ApiResponse::new(422, r#"{"detail":"invalid"}"#);
    assert_eq!(resp.json::<Value>()?, json!({ "detail": "invalid" }));
    assert_eq!(resp.text(), r#"{"detail":"invalid"}"#);
    assert!(ApiResponse::new(200, "nope").json::<Value>().is_err());
    Ok(())
}

#[test]
fn header_lookup_ignores_case() {
    let mut resp = ApiResponse::new(200, "");
    resp.headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(resp.header("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(resp.header("x-missing"), None);
}

#[yare::parameterized(
    connect = { TransportError::connect("refused"), true, "connect error: refused" },
    timeout = { TransportError::timeout("elapsed"), true, "timeout error: elapsed" },
    other   = { TransportError::other("bad header"), false, "other error: bad header" },
)]
fn transport_error_classification(err: TransportError, network: bool, display: &str) {
    assert_eq!(err.is_network(), network);
    assert_eq!(err.to_string(), display);
}
