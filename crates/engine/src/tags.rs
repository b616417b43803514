//! Built-in tags.
//!
//! Installed into [`TagRegistry::builtin`]; hosts can shadow or extend any
//! of these through [`TagRegistry::with_tag`]. Arity is enforced by the
//! interpreter before a handler runs, so handlers index their arguments
//! directly.

use crate::blueprint::Blueprint;
use crate::channel::{CapsMode, Visibility};
use crate::error::{EngineError, Result};
use crate::math::format_number;
use crate::registry::{TagInvocation, TagRegistry};
use crate::repeater::{RepCount, Repeater};
use crate::sync::SyncType;

use crate::registry::ParamMode::{Eager, Lazy};

fn invalid(name: &str, inv: &TagInvocation, message: impl Into<String>) -> EngineError {
    EngineError::InvalidArgument {
        name: name.to_string(),
        message: message.into(),
        span: inv.span,
    }
}

fn parse_count(name: &str, inv: &TagInvocation, arg: &str) -> Result<RepCount> {
    if arg == "each" {
        return Ok(RepCount::Each);
    }
    arg.trim()
        .parse::<usize>()
        .map(RepCount::Times)
        .map_err(|_| invalid(name, inv, format!("expected a count or 'each', got '{arg}'")))
}

fn parse_index(name: &str, inv: &TagInvocation, arg: &str) -> Result<usize> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| invalid(name, inv, format!("expected a number, got '{arg}'")))
}

/// Install every built-in tag.
pub(crate) fn install(registry: &mut TagRegistry) {
    // Block decorations, consumed by the next block.
    registry.register(
        "rep",
        vec![Eager],
        Box::new(|interp, inv| {
            let count = parse_count("rep", &inv, &inv.eager[0])?;
            interp.pending_mut().count = Some(count);
            Ok(())
        }),
    );
    registry.register(
        "sep",
        vec![Lazy],
        Box::new(|interp, inv| {
            interp.pending_mut().separator = Some(inv.lazy[0]);
            Ok(())
        }),
    );
    registry.register(
        "before",
        vec![Lazy],
        Box::new(|interp, inv| {
            interp.pending_mut().before = Some(inv.lazy[0]);
            Ok(())
        }),
    );
    registry.register(
        "after",
        vec![Lazy],
        Box::new(|interp, inv| {
            interp.pending_mut().after = Some(inv.lazy[0]);
            Ok(())
        }),
    );

    // Synchronizers.
    registry.register(
        "sync",
        vec![Eager, Eager],
        Box::new(|interp, inv| {
            let id = inv.eager[0].clone();
            let sync_type = SyncType::parse(&inv.eager[1]).ok_or_else(|| {
                invalid("sync", &inv, format!("unknown synchronizer type '{}'", inv.eager[1]))
            })?;
            interp.ensure_sync(&id, sync_type);
            interp.pending_mut().sync_id = Some(id);
            Ok(())
        }),
    );
    registry.register(
        "xpin",
        vec![Eager],
        Box::new(|interp, inv| {
            if let Some(sync) = interp.sync_mut(&inv.eager[0]) {
                sync.set_pinned(true);
            }
            Ok(())
        }),
    );
    registry.register(
        "xunpin",
        vec![Eager],
        Box::new(|interp, inv| {
            if let Some(sync) = interp.sync_mut(&inv.eager[0]) {
                sync.set_pinned(false);
            }
            Ok(())
        }),
    );
    registry.register(
        "xstep",
        vec![Eager],
        Box::new(|interp, inv| {
            if let Some(sync) = interp.sync_mut(&inv.eager[0]) {
                sync.force_step();
            }
            Ok(())
        }),
    );
    registry.register(
        "xreset",
        vec![Eager],
        Box::new(|interp, inv| {
            if let Some(sync) = interp.sync_mut(&inv.eager[0]) {
                sync.reset();
            }
            Ok(())
        }),
    );

    // Channels.
    registry.register(
        "chan",
        vec![Eager, Eager, Lazy],
        Box::new(|interp, inv| {
            let name = inv.eager[0].clone();
            let visibility = Visibility::parse(&inv.eager[1]).ok_or_else(|| {
                invalid("chan", &inv, format!("unknown visibility '{}'", inv.eager[1]))
            })?;
            interp.output().borrow_mut().push(&name, visibility);
            interp.push_scoped_frame(inv.lazy[0], Blueprint::PopChannel(name))
        }),
    );
    registry.register(
        "caps",
        vec![Eager],
        Box::new(|interp, inv| {
            let mode = CapsMode::parse(&inv.eager[0]).ok_or_else(|| {
                invalid("caps", &inv, format!("unknown caps mode '{}'", inv.eager[0]))
            })?;
            interp.output().borrow_mut().set_caps(mode);
            Ok(())
        }),
    );

    // Write points and markers.
    registry.register(
        "target",
        vec![Eager],
        Box::new(|interp, inv| {
            interp.output().borrow_mut().set_write_point(&inv.eager[0]);
            Ok(())
        }),
    );
    registry.register(
        "send",
        vec![Eager, Eager],
        Box::new(|interp, inv| {
            interp
                .output()
                .borrow_mut()
                .insert_at(&inv.eager[0], &inv.eager[1])
        }),
    );
    registry.register(
        "mark",
        vec![Eager],
        Box::new(|interp, inv| {
            interp.output().borrow_mut().set_marker(&inv.eager[0]);
            Ok(())
        }),
    );
    registry.register(
        "dist",
        vec![Eager, Eager],
        Box::new(|interp, inv| {
            let distance = interp
                .output()
                .borrow()
                .distance(&inv.eager[0], &inv.eager[1])
                .unwrap_or(0);
            interp.write(&format_number(distance as f64))
        }),
    );

    // Positional tags. Silent outside an active repetition.
    positional(registry, "first", |r| r.is_first());
    positional(registry, "notfirst", |r| !r.is_first());
    positional(registry, "last", |r| r.is_last());
    positional(registry, "notlast", |r| !r.is_last());
    positional(registry, "odd", |r| r.is_odd());
    positional(registry, "even", |r| r.is_even());
    registry.register(
        "nth",
        vec![Eager, Eager, Lazy],
        Box::new(|interp, inv| {
            let offset = parse_index("nth", &inv, &inv.eager[0])?;
            let interval = parse_index("nth", &inv, &inv.eager[1])?;
            let hit = interp
                .active_repeater()
                .map(|r| r.nth(offset, interval))
                .unwrap_or(false);
            if hit {
                interp.push_body_frame(inv.lazy[0])?;
            }
            Ok(())
        }),
    );
    registry.register(
        "repnum",
        vec![],
        Box::new(|interp, _inv| {
            let number = interp.active_repeater().map(|r| r.number());
            match number {
                Some(n) => interp.write(&format_number(n as f64)),
                None => Ok(()),
            }
        }),
    );
    registry.register(
        "repcount",
        vec![],
        Box::new(|interp, _inv| {
            let count = interp.active_repeater().map(|r| r.count());
            match count {
                Some(n) => interp.write(&format_number(n as f64)),
                None => Ok(()),
            }
        }),
    );

    // Subroutine arguments.
    registry.register(
        "arg",
        vec![Eager],
        Box::new(|interp, inv| {
            let value = interp
                .local_arg(&inv.eager[0])
                .map(str::to_string)
                .ok_or_else(|| {
                    invalid("arg", &inv, format!("no argument named '{}' in scope", inv.eager[0]))
                })?;
            interp.write(&value)
        }),
    );
}

fn positional(registry: &mut TagRegistry, name: &'static str, predicate: fn(&Repeater) -> bool) {
    registry.register(
        name,
        vec![Lazy],
        Box::new(move |interp, inv| {
            let hit = interp
                .active_repeater()
                .map(|r| predicate(r))
                .unwrap_or(false);
            if hit {
                interp.push_body_frame(inv.lazy[0])?;
            }
            Ok(())
        }),
    );
}
