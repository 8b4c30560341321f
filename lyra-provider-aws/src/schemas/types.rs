//! AWS-specific type definitions

use std::sync::LazyLock;

use lyra_core::resource::Value;
use lyra_core::schema::AttributeType;
use regex::Regex;

static IDENTITY_POOL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+:[0-9a-f-]+$").expect("valid regex"));

static THING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9:_-]+$").expect("valid regex"));

static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]*)?-[a-z]+-\d+$").expect("valid regex"));

fn check_len(value: &Value, min: usize, max: usize) -> Result<&str, String> {
    let Value::String(s) = value else {
        return Err("Expected string".to_string());
    };
    let len = s.chars().count();
    if len < min || len > max {
        return Err(format!(
            "expected length between {} and {}, got {}",
            min, max, len
        ));
    }
    Ok(s)
}

/// Cognito identity pool ID, e.g. `us-east-1:0f1e...`
pub fn identity_pool_id() -> AttributeType {
    AttributeType::Custom {
        name: "IdentityPoolId".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let s = check_len(value, 1, 55)?;
            if IDENTITY_POOL_ID.is_match(s) {
                Ok(())
            } else {
                Err(format!(
                    "Invalid identity pool ID '{}', expected <region>:<guid>",
                    s
                ))
            }
        },
    }
}

/// Name of an identity provider linked to an identity pool
pub fn identity_provider_name() -> AttributeType {
    AttributeType::Custom {
        name: "IdentityProviderName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| check_len(value, 1, 128).map(|_| ()),
    }
}

/// IoT thing name
pub fn thing_name() -> AttributeType {
    AttributeType::Custom {
        name: "ThingName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let s = check_len(value, 1, 128)?;
            if THING_NAME.is_match(s) {
                Ok(())
            } else {
                Err(format!("Invalid thing name '{}'", s))
            }
        },
    }
}

pub fn arn() -> AttributeType {
    AttributeType::Custom {
        name: "Arn".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            let s = check_len(value, 1, 2048)?;
            if s.starts_with("arn:") {
                Ok(())
            } else {
                Err(format!("Invalid ARN '{}', expected arn:<partition>:...", s))
            }
        },
    }
}

/// AWS region name, e.g. `ap-northeast-1`
pub fn aws_region() -> AttributeType {
    AttributeType::Custom {
        name: "Region".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if REGION.is_match(s) => Ok(()),
            Value::String(s) => Err(format!(
                "Invalid region '{}', expected a region name like ap-northeast-1",
                s
            )),
            _ => Err("Expected string".to_string()),
        },
    }
}
