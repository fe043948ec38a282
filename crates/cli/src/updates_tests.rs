// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tags_are_compared_without_v_prefix() {
    assert_eq!(normalize_tag("v0.2.0"), "0.2.0");
    assert_eq!(normalize_tag("0.2.0"), "0.2.0");
    assert_eq!(normalize_tag(" v1.0.0 "), "1.0.0");
}

#[test]
fn release_payload_parses_tag_name() {
    let release: Release =
        serde_json::from_str(r#"{"tag_name": "v0.3.1", "assets": []}"#).unwrap();
    assert_eq!(release.tag_name, "v0.3.1");
}

#[tokio::test]
async fn disabled_policy_skips_the_network() {
    // Completes immediately without touching LATEST_RELEASE_URL.
    check_for_updates(UpdatePolicy::Disabled).await;
}
