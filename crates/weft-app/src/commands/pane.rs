use std::path::PathBuf;

use log::info;

use weft_mux::{Direction, MuxError, Orientation, Size};

use super::window::focus_window;
use super::{current_window, resolve_pane, Context};
use crate::command::CommandError;
use crate::keys::encode_keys;
use crate::state::Server;

/// Splits the target pane. `horizontal` puts the new pane to the right,
/// otherwise below; `percent` is the new pane's share.
pub fn split_window(
    server: &mut Server,
    ctx: &Context,
    horizontal: bool,
    percent: Option<u8>,
    cwd: Option<PathBuf>,
    target: Option<&str>,
    command: &[String],
) -> Result<String, CommandError> {
    let target = resolve_pane(server, ctx, target)?;
    let window = server.mux.window_of(target).ok_or(MuxError::PaneNotFound(target))?;
    let win = server.mux.window(window).ok_or(MuxError::WindowNotFound(window))?;
    let rect = win.pane_rect(target).unwrap_or_else(|| win.area());
    let orientation = if horizontal {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    let ratio = percent.map(|p| 1.0 - f64::from(p) / 100.0).unwrap_or(0.5);
    // the exact size is applied once the pane is in the layout
    let size = match orientation {
        Orientation::Horizontal => Size::new(rect.rows, (rect.cols / 2).max(1)),
        Orientation::Vertical => Size::new((rect.rows / 2).max(1), rect.cols),
    };

    let pane = server.mux.alloc_pane();
    server.spawn_pane(pane, size, command, cwd, Some(target))?;
    if let Err(e) = server.mux.split_pane(target, orientation, ratio, pane) {
        server.panes.remove(pane);
        return Err(e.into());
    }
    info!("split {target} into {pane} in window {window}");
    Ok(String::new())
}

pub fn kill_pane(server: &mut Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    server.kill_pane(pane)?;
    info!("killed pane {pane}");
    Ok(String::new())
}

/// Names a pane. The name shows as its title until cleared with an empty one.
pub fn rename_pane(server: &mut Server, ctx: &Context, target: Option<&str>, name: &str) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    server
        .panes
        .get_mut(pane)
        .ok_or(MuxError::PaneNotFound(pane))?
        .set_name(name);
    Ok(String::new())
}

/// Moves focus by direction within the current window, or to the target
/// pane and its window.
pub fn select_pane(
    server: &mut Server,
    ctx: &Context,
    direction: Option<Direction>,
    target: Option<&str>,
) -> Result<String, CommandError> {
    if let Some(direction) = direction {
        let window = current_window(server, ctx)?;
        server
            .mux
            .window_mut(window)
            .ok_or(MuxError::WindowNotFound(window))?
            .select_direction(direction)?;
        return Ok(String::new());
    }
    let pane = resolve_pane(server, ctx, target)?;
    let window = server.mux.window_of(pane).ok_or(MuxError::PaneNotFound(pane))?;
    server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .select_pane(pane)?;
    focus_window(server, ctx, window)?;
    Ok(String::new())
}

pub fn last_pane(server: &mut Server, ctx: &Context) -> Result<String, CommandError> {
    let window = current_window(server, ctx)?;
    server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .select_last_pane()?;
    Ok(String::new())
}

/// Swaps the active pane with the one `step` places away in tree order.
/// Focus stays on the pane that moved.
pub fn swap_pane(server: &mut Server, ctx: &Context, step: isize) -> Result<String, CommandError> {
    let window = current_window(server, ctx)?;
    let win = server.mux.window_mut(window).ok_or(MuxError::WindowNotFound(window))?;
    let panes = win.panes();
    if panes.len() < 2 {
        return Err(MuxError::SinglePane.into());
    }
    let active = win.active_pane();
    let idx = panes.iter().position(|p| *p == active).unwrap_or(0) as isize;
    let other = panes[(idx + step).rem_euclid(panes.len() as isize) as usize];
    win.swap_panes(active, other)?;
    Ok(String::new())
}

/// Moves the pane into a new window of its own.
pub fn break_pane(server: &mut Server, ctx: &Context, detached: bool, target: Option<&str>) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    let window = server.mux.break_pane(pane, !detached)?;
    let name = server
        .panes
        .get(pane)
        .map(|p| p.command().program_name().to_string())
        .unwrap_or_default();
    if let Some(w) = server.mux.window_mut(window) {
        w.rename(name);
    }
    if !detached {
        focus_window(server, ctx, window)?;
    }
    info!("broke pane {pane} out into window {window}");
    Ok(String::new())
}

/// Applies each requested edge move, then `-Z`.
pub fn resize_pane(
    server: &mut Server,
    ctx: &Context,
    steps: &[(Direction, Option<u16>)],
    zoom: bool,
    target: Option<&str>,
) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    let window = server.mux.window_of(pane).ok_or(MuxError::PaneNotFound(pane))?;
    let win = server.mux.window_mut(window).ok_or(MuxError::WindowNotFound(window))?;
    for (direction, amount) in steps {
        if let Some(amount) = amount {
            win.resize_pane(pane, *direction, *amount)?;
        }
    }
    if zoom {
        if win.active_pane() != pane {
            win.select_pane(pane)?;
        }
        win.toggle_zoom();
    }
    Ok(String::new())
}

pub fn send_keys(
    server: &mut Server,
    ctx: &Context,
    literal: bool,
    target: Option<&str>,
    keys: &[String],
) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    let bytes = encode_keys(keys, literal);
    let p = server.panes.get_mut(pane).ok_or(MuxError::PaneNotFound(pane))?;
    p.write_input(&bytes)?;
    Ok(String::new())
}

pub fn clear_history(server: &mut Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let pane = resolve_pane(server, ctx, target)?;
    server
        .panes
        .get_mut(pane)
        .ok_or(MuxError::PaneNotFound(pane))?
        .screen_mut()
        .clear_history();
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use crate::command::CommandError;
    use crate::state::tests::Harness;
    use pretty_assertions::assert_eq;
    use weft_mux::{MuxError, PaneId, Window};

    fn window(h: &Harness) -> &Window {
        let session = h.server.mux.sessions().next().unwrap();
        h.server.mux.window(session.active_window()).unwrap()
    }

    fn panes(h: &Harness) -> Vec<PaneId> {
        window(h).panes()
    }

    #[test]
    fn test_split_and_kill() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        let first = panes(&h)[0];
        h.run("split-window -h").unwrap();
        let all = panes(&h);
        assert_eq!(all.len(), 2);
        assert_eq!(window(&h).active_pane(), all[1]);
        let rects = window(&h).visible_panes();
        assert_eq!(rects[0].1.row, rects[1].1.row);
        assert!(rects[0].1.col < rects[1].1.col);
        // the new process was resized to its rectangle
        let new_size = h.server.panes.get(all[1]).unwrap().size();
        assert_eq!(new_size, rects[1].1.size());

        h.run("kill-pane").unwrap();
        assert_eq!(panes(&h), vec![first]);
        assert_eq!(window(&h).active_pane(), first);
        assert_eq!(h.server.panes.len(), 1);
        h.server.mux.check_invariants().unwrap();
    }

    #[test]
    fn test_split_percent() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("splitw -v -p 25").unwrap();
        let rects = window(&h).visible_panes();
        assert!(rects[1].1.rows < rects[0].1.rows);
        assert!(matches!(h.run("splitw -p 0"), Err(CommandError::Parse(_))));
    }

    #[test]
    fn test_select_pane_directions() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("splitw -h").unwrap();
        let all = panes(&h);
        h.run("selectp -L").unwrap();
        assert_eq!(window(&h).active_pane(), all[0]);
        assert!(matches!(
            h.run("selectp -L"),
            Err(CommandError::Mux(MuxError::NoNeighbor(_)))
        ));
        h.run("lastp").unwrap();
        assert_eq!(window(&h).active_pane(), all[1]);
        h.run(&format!("selectp -t {}", all[0])).unwrap();
        assert_eq!(window(&h).active_pane(), all[0]);
        h.run("selectp -t :.+").unwrap();
        assert_eq!(window(&h).active_pane(), all[1]);
    }

    #[test]
    fn test_swap_pane_keeps_focus() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("splitw").unwrap();
        let before = panes(&h);
        let active = window(&h).active_pane();
        h.run("swapp -D").unwrap();
        assert_eq!(panes(&h), vec![before[1], before[0]]);
        assert_eq!(window(&h).active_pane(), active);
    }

    #[test]
    fn test_rename_pane_sets_title() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        assert_eq!(h.run("display -p '#T'").unwrap(), "sh");
        h.run("renamep logs").unwrap();
        assert_eq!(h.run("display -p '#T'").unwrap(), "logs");
        let pane = panes(&h)[0];
        assert_eq!(h.server.panes.get(pane).unwrap().name(), Some("logs"));

        h.run("rename-pane ''").unwrap();
        assert_eq!(h.server.panes.get(pane).unwrap().name(), None);
        assert_eq!(h.run("display -p '#T'").unwrap(), "sh");
        assert!(matches!(h.run("renamep -t %99 x"), Err(CommandError::Target(_))));
    }

    #[test]
    fn test_break_pane() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        assert!(matches!(h.run("breakp"), Err(CommandError::Mux(MuxError::SinglePane))));
        h.run("splitw").unwrap();
        let moved = window(&h).active_pane();
        h.run("break-pane").unwrap();
        let session = h.server.mux.sessions().next().unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(window(&h).panes(), vec![moved]);
        assert_eq!(window(&h).name(), "sh");
        h.server.mux.check_invariants().unwrap();
    }

    #[test]
    fn test_resize_and_zoom() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("splitw -h").unwrap();
        let before = window(&h).visible_panes();
        h.run("resize-pane -L 5").unwrap();
        let after = window(&h).visible_panes();
        assert_eq!(after[1].1.cols, before[1].1.cols + 5);

        h.run("resizep -Z").unwrap();
        assert!(window(&h).is_zoomed());
        assert_eq!(window(&h).visible_panes().len(), 1);
        h.run("resizep -Z").unwrap();
        assert!(!window(&h).is_zoomed());
    }

    #[test]
    fn test_send_keys_and_clear_history() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("send-keys 'echo sent-$((2+3))' Enter").unwrap();
        let pane = panes(&h)[0];
        assert!(h.pump_until(|s| {
            let snap = s.panes.get(pane).unwrap().screen().snapshot();
            (0..snap.rows).any(|r| snap.row_text(r) == "sent-5")
        }));
        h.run("clear-history").unwrap();
        assert!(matches!(h.run("send-keys -t %999 x"), Err(CommandError::Target(_))));
    }
}
