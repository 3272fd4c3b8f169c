use crate::db::MirrorLink;

/// Where a reaction or delete event must be replayed. A link resolves
/// symmetrically: the event may reference either the original or the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CounterpartRef {
    pub(crate) channel_id: String,
    pub(crate) message_id: String,
}

/// Resolve the counterpart of a message the platform referenced in a
/// reaction event. `forward` is the lookup by original id, `reverse` by
/// mirror id; forward wins when both somehow resolve.
pub(crate) fn resolve_counterpart(
    forward: Option<&MirrorLink>,
    reverse: Option<&MirrorLink>,
) -> Option<CounterpartRef> {
    if let Some(link) = forward {
        return Some(CounterpartRef {
            channel_id: link.mirrored_channel_id.clone(),
            message_id: link.mirrored_message_id.clone(),
        });
    }

    reverse.map(|link| CounterpartRef {
        channel_id: link.original_channel_id.clone(),
        message_id: link.original_message_id.clone(),
    })
}

/// What a delete event requires. Deleting an original tears down the mirror
/// and the record; a mirror deleted out-of-band only purges the record (no
/// counter-post is ever attempted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeletePlan {
    MirrorAndRecord {
        mirror_channel_id: String,
        mirror_message_id: String,
        webhook_id: String,
    },
    RecordOnly,
    Ignore,
}

pub(crate) fn plan_delete(forward: Option<&MirrorLink>, reverse: Option<&MirrorLink>) -> DeletePlan {
    if let Some(link) = forward {
        return DeletePlan::MirrorAndRecord {
            mirror_channel_id: link.mirrored_channel_id.clone(),
            mirror_message_id: link.mirrored_message_id.clone(),
            webhook_id: link.webhook_id.clone(),
        };
    }

    if reverse.is_some() {
        DeletePlan::RecordOnly
    } else {
        DeletePlan::Ignore
    }
}

/// An edit only needs syncing when the body actually changed. Discord sends
/// update events for embed resolution and the like; when the old body is
/// unknown the edit is synced anyway rather than dropped.
pub(crate) fn edit_requires_sync(old_content: Option<&str>, new_content: &str) -> bool {
    match old_content {
        Some(old) => old != new_content,
        None => true,
    }
}

pub(crate) fn preview_text(value: &str) -> String {
    const MAX_PREVIEW_CHARS: usize = 120;
    let mut chars = value.chars();
    let preview: String = chars.by_ref().take(MAX_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}…")
    } else {
        preview
    }
}
