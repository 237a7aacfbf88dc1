//! # Plugin Surface
//!
//! Community-string semantics are specific to a single operator's BGP
//! tagging conventions, so they live behind a stateless
//! [`CommunityDecoderPlugin`] trait rather than in the walker itself
//! (§4.H). [`FisCommunityDecoder`] is the bundled decoder, ported from
//! `original_source/backend/plugins/fis_community_decoder.py`'s OID/AID
//! convention.

use std::collections::HashMap;

/// A stateless decoder that turns a route's raw BGP communities (and,
/// where known, its local-preference) into a small set of human-readable
/// annotations attached to a [`crate::walker::HopResult`].
///
/// Implementations must not hold per-call state: the walker may invoke
/// `decode` concurrently across ECMP siblings.
pub trait CommunityDecoderPlugin: Send + Sync {
    /// A short, stable identifier for this decoder (used in trace output
    /// to say which plugin annotated a hop).
    fn name(&self) -> &str;

    /// Decode `communities` (and `local_pref`, if known) into a map of
    /// annotation key to value. An empty map means nothing in
    /// `communities` matched this decoder's conventions.
    fn decode(&self, communities: &[String], local_pref: Option<i64>) -> HashMap<String, String>;
}

const OID_MARKER: i64 = 1594;
const AID_MARKER: i64 = 194;

const LP_PRIMARY: i64 = 200;
const LP_SECONDARY: i64 = 150;
const LP_TERTIARY: i64 = 50;

fn site_region(site: i64) -> &'static str {
    match site {
        1 | 2 | 3 | 4 => "americas",
        7 | 8 => "emea",
        17 | 18 | 19 => "apac",
        _ => "unknown",
    }
}

/// Decodes the OID/AID BGP community convention used to identify a route's
/// originating and advertising site, ported from the bundled Python
/// reference decoder.
#[derive(Debug, Default, Clone)]
pub struct FisCommunityDecoder;

impl FisCommunityDecoder {
    /// Construct a new decoder. Stateless; cheap to share.
    pub fn new() -> Self {
        Self
    }

    /// Parse `"ASN:VALUE"` into its two integer halves, or `None` if
    /// `comm` isn't in that shape.
    fn parse_community(comm: &str) -> Option<(i64, i64)> {
        let (left, right) = comm.split_once(':')?;
        Some((left.parse().ok()?, right.parse().ok()?))
    }
}

impl CommunityDecoderPlugin for FisCommunityDecoder {
    fn name(&self) -> &str {
        "fis-community-decoder"
    }

    fn decode(&self, communities: &[String], local_pref: Option<i64>) -> HashMap<String, String> {
        let mut result = HashMap::new();

        for comm in communities {
            let Some((left, right)) = Self::parse_community(comm) else {
                continue;
            };

            if right == OID_MARKER {
                result.insert("origin_site".to_string(), format!("Site-{left}"));
                result.insert("region".to_string(), site_region(left).to_string());
            } else if right == AID_MARKER {
                result.insert("advertising_site".to_string(), format!("Site-{left}"));
            }
        }

        if let Some(lp) = local_pref {
            let preference = if lp >= LP_PRIMARY {
                Some("primary")
            } else if lp >= LP_SECONDARY {
                Some("secondary")
            } else if lp <= LP_TERTIARY {
                Some("tertiary")
            } else {
                None
            };
            if let Some(preference) = preference {
                result.insert("preference".to_string(), preference.to_string());
            }
        }

        result
    }
}
