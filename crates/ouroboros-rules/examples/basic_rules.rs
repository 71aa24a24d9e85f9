//! Basic Rules Example
//!
//! Validates a signup payload and prints every error view.
//!
//! Run with:
//! ```bash
//! cargo run -p ouroboros-rules --example basic_rules
//! ```

use ouroboros_rules::{MethodOutput, Validator, Value};
use serde_json::json;

fn print_view(title: &str, view: Value) {
    let json: serde_json::Value = view.into();
    println!("  {}:", title);
    println!("    {}", json);
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Ouroboros Rules - Basic Example");
    println!("===============================\n");

    let validator = Validator::new()
        .set_validation_global(true)
        .add_method("username", |params: &[Value]| match params.first().and_then(Value::as_str) {
            Some(name) if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                MethodOutput::Pass
            }
            _ => MethodOutput::message("@this may only contain letters, digits and '_'"),
        })
        .set_rules(json!({
            "name": "required|username|len<=>=[3,16]",
            "email": "required|email",
            "age": "required|int|>=[18] >> [>=]=> @this must be at least @p1 to sign up",
            "height": ["optional|<=>=[100,250]", "optional|(s)[short,tall]"],
            "tags[optional].*": "string|len<=[10]",
            "address": {
                "city": "required|string",
                "zip": "optional|/^\\d{5}$/",
            },
        }));

    let payloads = [
        json!({
            "name": "ada_l",
            "email": "ada@example.com",
            "age": 36,
            "height": "tall",
            "address": {"city": "London"},
        }),
        json!({
            "name": "a!",
            "email": "not-an-email",
            "age": 16,
            "height": 90,
            "tags": ["rust", 7],
            "address": {"zip": "12ab"},
        }),
    ];

    for (i, payload) in payloads.into_iter().enumerate() {
        println!("Payload {}: {}", i + 1, payload);
        let session = validator.validate(&payload.into());
        println!("  valid: {}", session.is_valid());

        if !session.is_valid() {
            print_view("classic simple", session.error(false, true));
            print_view("standard simple", session.error(true, true));
            print_view("standard complex", session.error(true, false));
        }
        print_view("result", session.into_result());
        println!();
    }
}
