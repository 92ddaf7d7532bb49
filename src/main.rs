// What you SEE:
// • The image you opened, with black masks painted over it.
// • Drag on empty space: draw a new mask. Drag a mask: move it.
// • Drag a white corner of the selected (red) mask: resize it.
// • DEL removes the selected mask. D suggests masks over dark regions
//   (dashed outlines), A accepts them, S saves the PNG. ESC quits.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use kuronuri::Error;
use kuronuri::config::Config;
use kuronuri::draw::{
    CROSSHAIR_COLOR, Drawer, PointerTracker, draw_crosshair, draw_text_5x7, paint_scene,
};
use kuronuri::io::{load_image, save_png};
use kuronuri::session::MaskSession;
use kuronuri::types::FrameBuffer;

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(e) = kuronuri::init_logging() {
        eprintln!("{e}");
    }

    let result = if config.auto { run_headless(&config) } else { run_window(&config) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "exiting");
            ExitCode::FAILURE
        }
    }
}

fn open_session(config: &Config) -> Result<MaskSession, Error> {
    let frame = load_image(&config.input)?;
    let mut session = MaskSession::new(config.session_options());
    session.load_image(frame);
    Ok(session)
}

fn export(session: &MaskSession, config: &Config) -> Result<(), Error> {
    match session.composite() {
        Some(masked) => save_png(&masked, &config.output),
        None => Err(Error::Export("no image loaded".into())),
    }
}

/// Detect, take every suggestion, save. No window.
fn run_headless(config: &Config) -> Result<(), Error> {
    let mut session = open_session(config)?;
    session.run_detection()?;
    if let Some(outcome) = session.wait_detection() {
        outcome?;
    }
    let added = session.accept_candidates();
    info!(masks = added, "auto-masked");
    export(&session, config)
}

fn run_window(config: &Config) -> Result<(), Error> {
    let mut session = open_session(config)?;
    let (w, h) = match session.canvas() {
        Some(canvas) => (canvas.width, canvas.height),
        None => return Err(Error::ImageLoad("no image loaded".into())),
    };

    /* --- Window setup ---
       Visual: a window exactly the size of the image opens. */
    let mut drawer = Drawer::new("Kuronuri — Mask Editor", w, h)?;

    /* --- Reusable screen buffer ---
       Visual: this is the image you actually see each frame. */
    let mut screen = FrameBuffer::new(w, h);
    let mut pointer = PointerTracker::default();

    /* --- HUD status line (last thing that happened) --- */
    let mut status = String::from("READY");

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Pointer: button edges become down / move / up gestures. */
        let mouse = drawer.mouse_pos();
        if let Some(event) = pointer.update(drawer.left_mouse_down(), mouse) {
            session.handle_pointer(event);
        }

        /* 2) Keys */
        if drawer.delete_pressed_once() && session.delete_key() {
            status = String::from("MASK REMOVED");
        }
        if drawer.d_pressed_once() {
            status = match session.run_detection() {
                Ok(true) => String::from("DETECTING..."),
                Ok(false) => String::from("NOTHING TO DETECT"),
                Err(e) => {
                    warn!(error = %e, "could not start detection");
                    String::from("DETECTION FAILED")
                }
            };
        }
        if drawer.a_pressed_once() {
            let added = session.accept_candidates();
            if added > 0 {
                status = format!("ACCEPTED {added}");
            }
        }
        if drawer.s_pressed_once() {
            status = match export(&session, config) {
                Ok(()) => format!("SAVED {}", config.output.display()),
                Err(e) => {
                    warn!(error = %e, "export failed");
                    String::from("SAVE FAILED")
                }
            };
        }

        let step = drawer.threshold_step();
        if step != 0 {
            let threshold = (session.options().threshold as i16 + step).clamp(0, 255) as u8;
            session.set_threshold(threshold);
            status = format!("THRESHOLD {threshold}");
        }

        /* 3) Detection finishes in the background; never block here. */
        if let Some(outcome) = session.poll_detection() {
            status = match outcome {
                Ok(found) => format!("FOUND {found} - A: ACCEPT"),
                Err(_) => String::from("DETECTION FAILED"),
            };
        }

        /* 4) Paint image, masks, handles, preview, suggestions. */
        if let Some(scene) = session.scene() {
            paint_scene(&mut screen, &scene);
        }

        if let Some(p) = mouse {
            draw_crosshair(&mut screen, p.x as i32, p.y as i32, 8, CROSSHAIR_COLOR);
        }

        let hud = format!(
            "MASKS: {} | SUGGESTED: {} | {}",
            session.masks().len(),
            session.candidates().len(),
            status
        );
        draw_text_5x7(&mut screen, 8, 8, &hud, 0x00_FF_FF_FF);
        draw_text_5x7(
            &mut screen,
            8,
            18,
            "DEL: REMOVE  D: DETECT  A: ACCEPT  S: SAVE  -/+: THRESHOLD",
            0x00_CC_CC_CC,
        );

        /* 5) Present to the window (this is when the on-screen image updates). */
        drawer.present(&screen)?;
    }

    Ok(())
}
