// Copyright 2024 The NativeLink Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;

use dockwork_error::{Code, Error, ResultExt, error_if, make_err, make_input_err};
use pretty_assertions::assert_eq;
use serde::de::Error as DeError;

#[test]
fn serde_deserialization_error_custom() {
    let error = <Error as DeError>::custom("Deserialization failed due to corrupted data");
    assert_eq!(error.code, Code::InvalidArgument);
    assert_eq!(
        error.messages,
        vec!["Deserialization failed due to corrupted data".to_string()]
    );
}

#[test]
fn err_tip_with_code_some() {
    let option = Some(42);
    let result: Result<i32, Error> =
        option.err_tip_with_code(|_error| (Code::Unknown, "Should not appear"));
    assert_eq!(result, Ok(42));
}

#[test]
fn err_tip_with_code_none() {
    let option: Option<i32> = None;
    let error = option
        .err_tip_with_code(|_error| (Code::InvalidArgument, "Missing value in option"))
        .unwrap_err();
    assert_eq!(error.code, Code::InvalidArgument);
    assert_eq!(error.messages, vec!["Missing value in option".to_string()]);
}

#[test]
fn err_tip_keeps_code_and_appends_message() {
    let result: Result<(), Error> = Err(make_err!(Code::Unavailable, "daemon is down"));
    let error = result.err_tip(|| "while listing containers").unwrap_err();
    assert_eq!(error.code, Code::Unavailable);
    assert_eq!(
        error.message_string(),
        "daemon is down : while listing containers"
    );
}

#[test]
fn code_to_error_conversion_has_no_messages() {
    let error: Error = Code::NotFound.into();
    assert_eq!(error.code, Code::NotFound);
    assert!(error.messages.is_empty());
}

#[test]
fn io_error_kinds_map_to_codes() {
    let refused: Error = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
    assert_eq!(refused.code, Code::Unavailable);

    let timed_out: Error = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
    assert_eq!(timed_out.code, Code::DeadlineExceeded);

    let missing: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
    assert_eq!(missing.code, Code::NotFound);
}

#[test]
fn is_unavailable_matches_connectivity_codes() {
    assert!(make_err!(Code::Unavailable, "x").is_unavailable());
    assert!(make_err!(Code::DeadlineExceeded, "x").is_unavailable());
    assert!(!make_err!(Code::Internal, "x").is_unavailable());
    assert!(!make_input_err!("x").is_unavailable());
}

#[test]
fn error_if_returns_invalid_argument() {
    fn check(value: usize) -> Result<(), Error> {
        error_if!(value == 0, "value must not be zero");
        Ok(())
    }
    assert_eq!(check(1), Ok(()));
    assert_eq!(
        check(0),
        Err(make_input_err!("value must not be zero"))
    );
}

#[test]
fn serde_json_syntax_error_is_invalid_argument() {
    let error: Error = serde_json::from_str::<serde_json::Value>("{not json")
        .unwrap_err()
        .into();
    assert_eq!(error.code, Code::InvalidArgument);
}

#[test]
fn display_omits_empty_messages() {
    let error: Error = Code::Aborted.into();
    assert_eq!(error.to_string(), "Error { code: Aborted }");
}

#[test]
fn serde_json5_error_keeps_tip() {
    let result: Result<u32, Error> =
        serde_json5::from_str::<u32>("{ port: }").err_tip(|| "Could not parse config file");
    let error = result.unwrap_err();
    assert_eq!(error.code, Code::InvalidArgument);
    assert_eq!(
        error.messages.last().map(String::as_str),
        Some("Could not parse config file")
    );
}

#[tokio::test]
async fn elapsed_timeout_is_deadline_exceeded() {
    let result: Result<(), Error> = tokio::time::timeout(
        core::time::Duration::from_millis(1),
        core::future::pending::<()>(),
    )
    .await
    .err_tip(|| "docker ps did not finish");
    let error = result.unwrap_err();
    assert_eq!(error.code, Code::DeadlineExceeded);
    assert!(error.is_unavailable());
}
