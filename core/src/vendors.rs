//! Manufacturer lookup from the MAC's OUI prefix.

use std::sync::OnceLock;

use mac_oui::Oui;
use pnet::util::MacAddr;
use tracing::warn;

/// Resolves device manufacturers from MAC addresses.
pub trait VendorRepository: Send + Sync {
    /// The vendor name, or `None` if the OUI is unknown.
    fn get_vendor(&self, mac: MacAddr) -> Option<String>;
}

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(err) => {
                warn!("OUI database unavailable, vendors will not be resolved: {err}");
                None
            }
        })
        .as_ref()
}

/// Lookups against the OUI database bundled with `mac_oui`.
pub struct MacOuiRepo;

impl VendorRepository for MacOuiRepo {
    fn get_vendor(&self, mac: MacAddr) -> Option<String> {
        match oui_db()?.lookup_by_mac(&mac.to_string()) {
            Ok(Some(entry)) => Some(entry.company_name.clone()),
            _ => None,
        }
    }
}

/// A repository that knows no vendors.
pub struct NoVendors;

impl VendorRepository for NoVendors {
    fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
        None
    }
}
