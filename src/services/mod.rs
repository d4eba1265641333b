/// OpenAPI documentation generation.
pub mod documentation;
/// Departures and disconnections.
pub mod exit_service;
/// Health check service.
pub mod health_service;
/// Room lifecycle and gameplay actions.
pub mod room_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
