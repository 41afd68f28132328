/// Local clock driver.
pub mod clock_ticker;
/// Operator gestures applied to the local store.
pub mod dispatcher;
/// Health check service.
pub mod health_service;
/// Control intent handling for the HTTP surface.
pub mod intent_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Remote/local synchronization engine.
pub mod sync_engine;
