use log::info;

use super::{current_window, resolve_session, Context};
use crate::command::CommandError;
use crate::state::{ConnId, ConnState, Server};

/// Detaches the issuing client, or with `others` every client but it. From
/// inside a pane with no client, the clients watching that pane's window
/// are the ones detached.
pub fn detach_client(server: &mut Server, ctx: &Context, others: bool) -> Result<String, CommandError> {
    let attached: Vec<(ConnId, weft_mux::ClientId)> = server
        .conns
        .iter()
        .filter_map(|(id, c)| match c.state {
            ConnState::Attached(client) => Some((*id, client)),
            _ => None,
        })
        .collect();

    let targets: Vec<ConnId> = if others {
        attached
            .iter()
            .filter(|(_, client)| Some(*client) != ctx.client)
            .map(|(conn, _)| *conn)
            .collect()
    } else if let Some(client) = ctx.client {
        server.conn_of(client).into_iter().collect()
    } else if ctx.pane.is_some() {
        let window = current_window(server, ctx)?;
        let watchers = server.mux.clients().watchers(window);
        attached
            .iter()
            .filter(|(_, client)| watchers.contains(client))
            .map(|(conn, _)| *conn)
            .collect()
    } else {
        return Err(CommandError::NoClient);
    };

    for conn in targets {
        server.detach_conn(conn, "detached");
    }
    Ok(String::new())
}

pub fn switch_client(server: &mut Server, ctx: &Context, target: &str) -> Result<String, CommandError> {
    let client = ctx.client.ok_or(CommandError::NoClient)?;
    let session = resolve_session(server, ctx, Some(target))?;
    let window = server.mux.switch_client(client, session)?;
    info!("client {client} switched to {session}, window {window}");
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use crate::command::CommandError;
    use crate::commands::Context;
    use crate::ipc::ServerMessage;
    use crate::state::tests::Harness;
    use crate::state::ConnState;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detach_requires_client() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        assert!(matches!(h.run("detach"), Err(CommandError::NoClient)));
    }

    #[test]
    fn test_detach_others() {
        let mut h = Harness::new();
        let (a, _rx_a) = h.attach(24, 80);
        let (b, mut rx_b) = h.attach(24, 80);
        let ctx = Context {
            client: Some(h.client(a)),
            pane: None,
        };
        h.server.run_line(&ctx, "detach-client -a").unwrap();
        assert!(matches!(h.server.connection_state(a), Some(ConnState::Attached(_))));
        assert_eq!(h.server.connection_state(b), Some(ConnState::Detached));
        assert_eq!(
            rx_b.try_recv().unwrap(),
            ServerMessage::Detached {
                reason: "detached".to_string()
            }
        );
    }

    #[test]
    fn test_detach_from_inside_pane() {
        let mut h = Harness::new();
        let (conn, _rx) = h.attach(24, 80);
        let pane = h.server.panes.ids()[0];
        let ctx = Context {
            client: None,
            pane: Some(pane),
        };
        h.server.run_line(&ctx, "detach").unwrap();
        assert_eq!(h.server.connection_state(conn), Some(ConnState::Detached));
    }

    #[test]
    fn test_switch_client() {
        let mut h = Harness::new();
        let (conn, _rx) = h.attach(24, 80);
        let client = h.client(conn);
        h.run("new-session -d -s other").unwrap();
        let ctx = Context {
            client: Some(client),
            pane: None,
        };
        h.server.run_line(&ctx, "switchc -t other").unwrap();
        let other = h.server.mux.session_by_name("other").unwrap().id();
        assert_eq!(h.server.mux.client(client).unwrap().session, other);
        assert!(matches!(h.run("switch-client -t other"), Err(CommandError::NoClient)));
    }
}
