//! Routing table: origin -> next-hop neighbor, learned from rumors.

use std::collections::HashMap;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub next_hop: SocketAddr,
    /// Id of the rumor that installed this route.
    pub via_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Route>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a rumor `(origin, id)` arrived from `from`.
    ///
    /// The last arrival wins unless it is behind the rumor that installed the
    /// current route. Returns `true` if the next hop changed.
    pub fn observe(&mut self, origin: &str, id: u32, from: SocketAddr) -> bool {
        match self.routes.get_mut(origin) {
            Some(route) if id < route.via_id => false,
            Some(route) => {
                let changed = route.next_hop != from;
                *route = Route {
                    next_hop: from,
                    via_id: id,
                };
                changed
            }
            None => {
                self.routes.insert(
                    origin.to_string(),
                    Route {
                        next_hop: from,
                        via_id: id,
                    },
                );
                true
            }
        }
    }

    pub fn next_hop(&self, origin: &str) -> Option<SocketAddr> {
        self.routes.get(origin).map(|r| r.next_hop)
    }

    /// Known destinations, sorted.
    pub fn origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self.routes.keys().cloned().collect();
        origins.sort();
        origins
    }
}
