//! Local control channel: newline-delimited JSON over a Unix stream socket.
//!
//! External processes (the CLI, scripts) trigger mode changes and query the
//! daemon through this channel. Handlers go straight to the mode
//! controller's public methods, so control-channel requests observe the same
//! happens-before ordering as direct hotkey activations.

pub mod client;
mod handler;
pub mod protocol;
mod server;

pub use handler::ControlHandler;
pub use protocol::{default_socket_path, Request, Response, MAX_REQUEST_BYTES};
pub use server::{IpcServer, RequestHandler};

#[cfg(test)]
mod end_to_end_tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, ConfigHandle, ConfigLoader};
    use crate::controller::Controller;
    use crate::geometry::{Point, Rect};
    use crate::metrics::Metrics;
    use crate::modes::Mode;
    use crate::ports::fake::FakeWorld;

    #[test]
    fn activation_round_trip_over_the_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("keywarp.sock");

        let world = FakeWorld::new(Rect::new(0, 0, 1920, 1080), Point::new(1, 1));
        let config = ConfigHandle::new(Config::default());
        let metrics = Arc::new(Metrics::default());
        let controller = Controller::new(world.ports(), config.clone(), metrics.clone());
        let handler = ControlHandler::new(
            controller.clone(),
            config,
            ConfigLoader::at(dir.path().join("config.toml")),
            metrics,
            world.accessibility.clone(),
            Arc::new(|| {}),
        );
        let _server = IpcServer::start(&socket, Arc::new(handler)).unwrap();

        let response = client::send(
            &socket,
            &Request::new("action").with_param("name", "grid"),
        )
        .unwrap();
        assert!(response.success, "{}", response.message);
        assert_eq!(controller.current_mode(), Mode::Grid);

        let response = client::send(&socket, &Request::new("status")).unwrap();
        assert_eq!(response.data["mode"], "grid");

        let response = client::send(&socket, &Request::new("stop")).unwrap();
        assert!(response.success);
        assert_eq!(controller.current_mode(), Mode::Idle);
    }
}
