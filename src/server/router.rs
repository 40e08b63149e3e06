//! Route table: route → method → handler, both keys case-insensitive.

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;

/// A route handler. Errors turn into `500` responses carrying the message.
pub type Handler = dyn Fn(&Request) -> anyhow::Result<Response> + Send + Sync;

/// Result of a two-step lookup.
pub enum Route<'a> {
    NotFound,
    /// The route exists but not for this method; lists the methods it has.
    MethodNotAllowed(Vec<String>),
    Found(&'a Handler),
}

#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, HashMap<String, Arc<Handler>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn route_key(route: &str) -> String {
        route.to_ascii_lowercase()
    }

    fn method_key(method: &str) -> String {
        method.to_ascii_uppercase()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn has_route(&self, route: &str) -> bool {
        self.routes.contains_key(&Self::route_key(route))
    }

    pub fn has_route_for_method(&self, route: &str, method: &str) -> bool {
        self.routes
            .get(&Self::route_key(route))
            .is_some_and(|methods| methods.contains_key(&Self::method_key(method)))
    }

    /// Registers `handler` for every method in `methods`, replacing any
    /// handler previously registered for the same route and method.
    pub fn add_route<S: AsRef<str>>(&mut self, route: &str, methods: &[S], handler: Arc<Handler>) {
        let table = self.routes.entry(Self::route_key(route)).or_default();
        for method in methods {
            table.insert(Self::method_key(method.as_ref()), Arc::clone(&handler));
        }
    }

    pub fn lookup(&self, route: &str, method: &str) -> Route<'_> {
        let Some(methods) = self.routes.get(&Self::route_key(route)) else {
            return Route::NotFound;
        };

        match methods.get(&Self::method_key(method)) {
            Some(handler) => Route::Found(handler.as_ref()),
            None => {
                let mut allowed: Vec<String> = methods.keys().cloned().collect();
                allowed.sort();
                Route::MethodNotAllowed(allowed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::message::HttpMessage;

    fn ok_handler() -> Arc<Handler> {
        Arc::new(|_req: &Request| Ok(Response::ok("ok")))
    }

    #[test]
    fn lookup_distinguishes_missing_route_from_missing_method() {
        let mut table = RouteTable::new();
        table.add_route("/a", &["GET"], ok_handler());

        assert!(matches!(table.lookup("/a", "get"), Route::Found(_)));
        assert!(matches!(table.lookup("/A", "GET"), Route::Found(_)));
        assert!(matches!(table.lookup("/b", "GET"), Route::NotFound));
        match table.lookup("/a", "POST") {
            Route::MethodNotAllowed(allowed) => assert_eq!(allowed, vec!["GET".to_string()]),
            _ => panic!("expected 405"),
        }
    }

    #[test]
    fn later_registration_overwrites_same_method() {
        let mut table = RouteTable::new();
        table.add_route("/a", &["GET", "POST"], ok_handler());
        table.add_route(
            "/a",
            &["post"],
            Arc::new(|_req: &Request| Ok(Response::ok("second"))),
        );

        let req = Request::new("POST", "/a");
        let Route::Found(handler) = table.lookup("/a", "POST") else {
            panic!("expected handler");
        };
        assert_eq!(handler(&req).unwrap().body(), b"second");
        assert!(table.has_route_for_method("/a", "get"));
        assert_eq!(table.len(), 1);
    }
}
