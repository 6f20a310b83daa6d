//! Fuzz target for decoding message parameters and dispatching them.

#![no_main]

use arbitrary::Arbitrary;
use ergonomic_win32::events::WindowEvents;
use ergonomic_win32::msg::{self, hi_word, lo_word, make_long, wm, WndMsg};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    msg: u32,
    wparam: usize,
    lparam: isize,
}

fuzz_target!(|input: Input| {
    let p = WndMsg::new(input.msg, input.wparam, input.lparam);

    let size = wm::Size::from_msg(&p);
    assert_eq!(make_long(size.client_width, size.client_height), p.lparam as u32);

    let cmd = wm::Command::from_msg(&p);
    assert_eq!(cmd.ctrl_id, lo_word(p.wparam));
    assert_eq!(cmd.code, hi_word(p.wparam));

    let mouse = wm::Mouse::from_msg(&p);
    assert_eq!(mouse.x, msg::get_x_lparam(p.lparam));

    // Notifications dereference lparam, so keep them out of the table.
    if p.msg == msg::WM_NOTIFY {
        return;
    }
    let events = WindowEvents::new();
    events.wm_command(cmd.ctrl_id, cmd.code, || Ok(()));
    events.wm(msg::WM_USER, |_| Ok(7));
    // SAFETY: WM_NOTIFY, the only message read through a pointer, is excluded.
    let out = unsafe { events.process(p) };
    if p.msg == msg::WM_COMMAND {
        assert!(matches!(out, Some(Ok(0))));
    }
});
