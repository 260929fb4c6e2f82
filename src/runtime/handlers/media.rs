use super::ExecContext;
use crate::application::api::Notification;
use crate::domain::entities::Suspension;
use crate::domain::value_objects::FadeType;

pub(super) fn play_bgm(ctx: &mut ExecContext<'_>, file: &str) {
    ctx.send_to_player(Notification::PlayMusic {
        file: file.to_string(),
    });
}

pub(super) fn fadeout_bgm(ctx: &mut ExecContext<'_>) {
    ctx.send_to_player(Notification::FadeMusic);
}

pub(super) fn play_sound(ctx: &mut ExecContext<'_>, file: &str) {
    ctx.send_to_player(Notification::PlaySound {
        file: file.to_string(),
    });
}

pub(super) fn stop_sounds(ctx: &mut ExecContext<'_>) {
    ctx.send_to_player(Notification::StopSounds);
}

/// Waiting needs a way for the picture to go away: a click or a timeout
pub(super) fn show_picture(
    ctx: &mut ExecContext<'_>,
    file: &str,
    size: u32,
    clickable: bool,
    hide_time_ms: u64,
    wait_until_closed: bool,
) {
    let wait = wait_until_closed && (clickable || hide_time_ms > 0);
    ctx.send_to_player(Notification::ShowPicture {
        file: file.to_string(),
        size,
        clickable,
        hide_time_ms,
        instance: wait.then(|| ctx.instance.id()),
    });
    if wait {
        ctx.suspend(Suspension::Picture);
    }
}

pub(super) fn hide_picture(ctx: &mut ExecContext<'_>) {
    ctx.send_to_player(Notification::HidePicture);
}

pub(super) fn screen_fade(ctx: &mut ExecContext<'_>, fade: FadeType, wait_for_completion: bool, duration_ms: u64) {
    if !ctx.world.is_online(ctx.player.id) {
        return;
    }
    ctx.player.fading = wait_for_completion;
    ctx.send_to_player(Notification::ScreenFade {
        fade,
        wait_for_completion,
        duration_ms,
    });
    if wait_for_completion {
        ctx.suspend(Suspension::Fade);
    }
}
