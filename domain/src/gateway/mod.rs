pub mod broadcast_relay;
