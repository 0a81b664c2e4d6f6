pub mod config;
pub mod ip;

use std::net::Ipv4Addr;

use anyhow::Result;

use crate::config::Settings;
use crate::ip::IpGetter;

/// Resolves the external IPv4 address with the built-in server list.
pub async fn myip() -> Result<Option<Ipv4Addr>> {
    let getter = IpGetter::from_settings(&Settings::default())?;
    Ok(getter.resolve().await)
}
