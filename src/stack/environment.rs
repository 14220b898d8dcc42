use crate::error::SynthError;
use std::fmt;

/// The AWS partition a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }

    pub fn dns_suffix(&self) -> &'static str {
        match self {
            Partition::AwsCn => "amazonaws.com.cn",
            _ => "amazonaws.com",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Aws => write!(f, "aws"),
            Partition::AwsCn => write!(f, "aws-cn"),
            Partition::AwsUsGov => write!(f, "aws-us-gov"),
        }
    }
}

/// The account and region a stack is deployed into.
///
/// Both are required up front so that named resources get their final ARNs
/// during the build, not after provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    account: String,
    region: String,
    partition: Partition,
}

impl Environment {
    pub fn new(account: &str, region: &str) -> Result<Self, SynthError> {
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(SynthError::InvalidEnvironment(format!(
                "account '{}' must be exactly 12 digits",
                account
            )));
        }
        if !is_region_shaped(region) {
            return Err(SynthError::InvalidEnvironment(format!(
                "region '{}' does not look like an AWS region (e.g. 'ap-northeast-1')",
                region
            )));
        }
        Ok(Self {
            account: account.to_string(),
            region: region.to_string(),
            partition: Partition::for_region(region),
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Builds an ARN. Pass an empty `region` for global services such as IAM.
    pub fn arn(&self, service: &str, region: &str, resource: &str) -> String {
        format!(
            "arn:{}:{}:{}:{}:{}",
            self.partition, service, region, self.account, resource
        )
    }

    /// The regional HTTPS control endpoint of a service, with a trailing slash.
    pub fn service_endpoint(&self, service: &str) -> String {
        format!(
            "https://{}.{}.{}/",
            service,
            self.region,
            self.partition.dns_suffix()
        )
    }

    /// The principal under which a service assumes roles, e.g. `states.amazonaws.com`.
    pub fn service_principal(&self, service: &str) -> String {
        format!("{}.amazonaws.com", service)
    }
}

// `<area>-<name>-<n>` with any number of name segments, e.g. `us-gov-west-1`.
fn is_region_shaped(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let (last, rest) = match parts.split_last() {
        Some(split) => split,
        None => return false,
    };
    !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
}
