//! `beep`: ring the bell for every incoming message.

use vcc_protocol::Request;

use crate::{Console, Plugin};

/// Rings the terminal bell for each message that reaches it, and lets the
/// message through untouched.
///
/// Load it after filters like `ban` so muted users don't ring.
#[derive(Debug, Default)]
pub struct BeepPlugin;

impl Plugin for BeepPlugin {
    fn name(&self) -> &str {
        "beep"
    }

    fn on_receive(&self, request: Request, console: &dyn Console) -> Option<Request> {
        console.bell();
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use vcc_protocol::MessageType;

    use super::*;
    use crate::BufferConsole;

    #[test]
    fn test_beep_rings_and_passes_through() {
        let console = BufferConsole::new();
        let request = Request {
            kind: MessageType::ChatBroadcast,
            uid: 0,
            session: 1,
            flags: 0,
            username: "bob".into(),
            message: "ping".into(),
        };

        let out = BeepPlugin.on_receive(request.clone(), &console);

        assert_eq!(out, Some(request));
        assert_eq!(console.errors(), vec!["\x07"]);
    }
}
