//! Credential checks that gate live tracking.
//!
//! A credential is either the admin code, which grants the whole fleet, or a
//! ticket id bound to one bus. The result is a [`Capability`] that sessions
//! consult instead of re-checking the credential.

use std::{collections::HashMap, fmt, sync::Arc};

use bustrack_transit::{BusIdentifier, TicketIdentifier};
use tracing::{debug, info};

use crate::fleet::FleetSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("credential not recognized")]
    CredentialNotRecognized,
}

/// What a viewer typed in. Surrounding whitespace is ignored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().is_empty()
    }
}

// never print the raw value, it may be the admin code
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Which buses a session may observe.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    AllBuses,
    SingleBus(BusIdentifier),
}

impl Capability {
    pub fn permits(&self, bus: &BusIdentifier) -> bool {
        match self {
            Self::AllBuses => true,
            Self::SingleBus(own) => own == bus,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::AllBuses)
    }
}

/// Source of ticket-to-bus assignments, owned by whoever issues tickets.
pub trait TicketRegistry: Send + Sync {
    fn bus_for(&self, ticket: &TicketIdentifier) -> Option<BusIdentifier>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticTicketRegistry {
    tickets: HashMap<TicketIdentifier, BusIdentifier>,
}

impl StaticTicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticket: TicketIdentifier, bus: BusIdentifier) {
        self.tickets.insert(ticket, bus);
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl FromIterator<(TicketIdentifier, BusIdentifier)> for StaticTicketRegistry {
    fn from_iter<I: IntoIterator<Item = (TicketIdentifier, BusIdentifier)>>(iter: I) -> Self {
        Self {
            tickets: iter.into_iter().collect(),
        }
    }
}

impl TicketRegistry for StaticTicketRegistry {
    fn bus_for(&self, ticket: &TicketIdentifier) -> Option<BusIdentifier> {
        self.tickets.get(ticket).cloned()
    }
}

/// Turns credentials into capabilities. Nothing is cached: every session
/// start validates again against the current fleet.
#[derive(Clone)]
pub struct AccessGate {
    admin_code: String,
    tickets: Arc<dyn TicketRegistry>,
}

impl AccessGate {
    pub fn new(admin_code: &str, tickets: Arc<dyn TicketRegistry>) -> Self {
        Self {
            admin_code: admin_code.trim().to_lowercase(),
            tickets,
        }
    }

    pub fn validate(
        &self,
        credential: &Credential,
        fleet: &FleetSnapshot,
    ) -> Result<Capability, AccessError> {
        if credential.is_blank() {
            return Err(AccessError::CredentialNotRecognized);
        }

        if credential.as_str().to_lowercase() == self.admin_code {
            info!("admin access granted");
            return Ok(Capability::AllBuses);
        }

        let ticket = TicketIdentifier::new(credential.as_str());
        match self.tickets.bus_for(&ticket) {
            Some(bus) if fleet.contains(&bus) => {
                info!(%ticket, %bus, "ticket access granted");
                Ok(Capability::SingleBus(bus))
            }
            Some(bus) => {
                debug!(%ticket, %bus, "ticket bound to a bus outside the fleet");
                Err(AccessError::CredentialNotRecognized)
            }
            None => {
                debug!(%ticket, "unknown ticket");
                Err(AccessError::CredentialNotRecognized)
            }
        }
    }
}
