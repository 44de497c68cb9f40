//! Network interface selection.
//!
//! The deployment ini lists interface-name prefixes in preference order
//! (e.g. `INTERFACES = wlan eth usb`).  Prefixes are tried in order; the
//! first interface whose name starts with the prefix and that carries an
//! IPv4 address wins.  If an interface has several IPv4 addresses, the
//! first one is picked.

use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("enumerating network interfaces: {0}")]
    Enumerate(#[from] std::io::Error),
    #[error("no interface matches preference list [{0}]")]
    NoMatch(String),
}

/// The interface the bridge binds and announces on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenInterface {
    pub name: String,
    pub ip: Ipv4Addr,
}

/// Pick the announce interface from the live interface table.
pub fn choose_interface(prefs: &[String]) -> Result<ChosenInterface, NetError> {
    let interfaces: Vec<(String, IpAddr)> = if_addrs::get_if_addrs()?
        .into_iter()
        .map(|iface| (iface.name.clone(), iface.ip()))
        .collect();
    match_preference(prefs, &interfaces)
        .ok_or_else(|| NetError::NoMatch(prefs.join(" ")))
}

/// Preference matching against a candidate list; split out for tests.
fn match_preference(
    prefs: &[String],
    interfaces: &[(String, IpAddr)],
) -> Option<ChosenInterface> {
    for pref in prefs {
        for (name, ip) in interfaces {
            if let IpAddr::V4(v4) = ip {
                if name.starts_with(pref.as_str()) {
                    return Some(ChosenInterface {
                        name: name.clone(),
                        ip: *v4,
                    });
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<(String, IpAddr)> {
        vec![
            ("lo".to_owned(), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            (
                "eth0".to_owned(),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)),
            ),
            (
                "wlan0".to_owned(),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            ),
            (
                "eth1".to_owned(),
                IpAddr::V6("fe80::1".parse().unwrap()),
            ),
        ]
    }

    #[test]
    fn preference_order_wins_over_interface_order() {
        let chosen =
            match_preference(&["wlan".to_owned(), "eth".to_owned()], &candidates()).unwrap();
        assert_eq!(chosen.name, "wlan0");
        assert_eq!(chosen.ip, Ipv4Addr::new(10, 0, 0, 7));
    }

    #[test]
    fn prefix_matches_numbered_interfaces() {
        let chosen = match_preference(&["eth".to_owned()], &candidates()).unwrap();
        assert_eq!(chosen.name, "eth0");
    }

    #[test]
    fn ipv6_only_interfaces_are_skipped() {
        let chosen = match_preference(&["eth1".to_owned()], &candidates());
        assert_eq!(chosen, None);
    }

    #[test]
    fn no_match_yields_none() {
        assert_eq!(match_preference(&["usb".to_owned()], &candidates()), None);
    }
}
