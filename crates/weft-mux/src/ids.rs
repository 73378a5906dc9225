//! Opaque identifiers. Every cross reference in the model goes through one of
//! these; none of them is ever reused while the server runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($sigil, "{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            /// Accepts both `7` and the prefixed form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix($sigil).unwrap_or(s).parse().map(Self)
            }
        }
    };
}

define_id!(
    /// A pane, displayed as `%N`.
    PaneId,
    "%"
);
define_id!(
    /// A window, displayed as `@N`.
    WindowId,
    "@"
);
define_id!(
    /// A session, displayed as `$N`.
    SessionId,
    "$"
);
define_id!(
    /// An attached or connecting client, displayed as `#N`.
    ClientId,
    "#"
);

/// Monotonic counters for every id kind.
#[derive(Debug, Default)]
pub struct IdAllocator {
    pane: u64,
    window: u64,
    session: u64,
    client: u64,
}

impl IdAllocator {
    pub fn pane(&mut self) -> PaneId {
        self.pane += 1;
        PaneId(self.pane)
    }

    pub fn window(&mut self) -> WindowId {
        self.window += 1;
        WindowId(self.window)
    }

    /// Sessions count from zero so the first default name is "0".
    pub fn session(&mut self) -> SessionId {
        let id = SessionId(self.session);
        self.session += 1;
        id
    }

    pub fn client(&mut self) -> ClientId {
        self.client += 1;
        ClientId(self.client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let pane = PaneId::from_raw(12);
        assert_eq!(pane.to_string(), "%12");
        assert_eq!("%12".parse::<PaneId>(), Ok(pane));
        assert_eq!("12".parse::<PaneId>(), Ok(pane));
        assert!("@12".parse::<PaneId>().is_err());
        assert_eq!(WindowId::from_raw(3).to_string(), "@3");
    }

    #[test]
    fn test_ids_increment() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.pane(), PaneId::from_raw(1));
        assert_eq!(ids.pane(), PaneId::from_raw(2));
        assert_eq!(ids.session(), SessionId::from_raw(0));
        assert_eq!(ids.session(), SessionId::from_raw(1));
        assert_eq!(ids.client(), ClientId::from_raw(1));
    }
}
