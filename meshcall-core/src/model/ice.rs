use crate::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_TURN_ADDR, DEFAULT_TURN_CREDENTIAL,
    DEFAULT_TURN_USERNAME,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// The static relay list the office deployment ships with.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::stun(DEFAULT_STUN_ADDR),
            Self::stun(DEFAULT_STUN_ADDR_2),
            Self {
                urls: vec![DEFAULT_TURN_ADDR.to_owned()],
                username: Some(DEFAULT_TURN_USERNAME.to_owned()),
                credential: Some(DEFAULT_TURN_CREDENTIAL.to_owned()),
            },
        ]
    }
}
