//! `WH_KEYBOARD_LL` hook thread
//!
//! The hook procedure runs on the thread that installed it, inside that
//! thread's message loop, so the dispatcher lives in a thread-local rather
//! than in process-global state.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL,
    WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER,
};

use crate::callback::shield;
use crate::error::HookError;
use crate::hotkey::dispatch::KeyEventDispatcher;
use crate::hotkey::keys::{vk, Key, KeyboardEvent, Modifiers};

thread_local! {
    static DISPATCHER: RefCell<Option<Arc<KeyEventDispatcher>>> = const { RefCell::new(None) };
}

pub struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

impl HookThread {
    pub fn stop(self) {
        unsafe {
            if let Err(e) = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                tracing::warn!(error = %e, "failed to post quit to hook thread");
            }
        }
        let _ = self.handle.join();
    }
}

pub fn spawn(dispatcher: Arc<KeyEventDispatcher>) -> Result<HookThread, HookError> {
    let (ready_tx, ready_rx) = bounded::<Result<u32, HookError>>(1);

    let handle = thread::Builder::new()
        .name("keyboard-hook".to_string())
        .spawn(move || {
            DISPATCHER.with(|slot| *slot.borrow_mut() = Some(dispatcher));

            let hook = match unsafe { install_hook() } {
                Ok(hook) => hook,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let mut msg = MSG::default();
            let thread_id = unsafe {
                // Make sure the message queue exists before anyone posts WM_QUIT
                let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
                GetCurrentThreadId()
            };
            let _ = ready_tx.send(Ok(thread_id));

            loop {
                let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                if result.0 <= 0 {
                    break;
                }
            }

            unsafe {
                let _ = UnhookWindowsHookEx(hook);
            }
            DISPATCHER.with(|slot| slot.borrow_mut().take());
        })
        .map_err(|e| HookError::InstallationFailed(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(thread_id)) => Ok(HookThread { thread_id, handle }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(HookError::InstallationFailed(
                "hook thread exited before reporting".to_string(),
            ))
        }
    }
}

unsafe fn install_hook() -> Result<HHOOK, HookError> {
    let module =
        GetModuleHandleW(None).map_err(|e| HookError::InstallationFailed(e.to_string()))?;
    SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), HINSTANCE(module.0), 0)
        .map_err(|e| HookError::InstallationFailed(e.to_string()))
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let _ = shield("keyboard hook", || {
            let message = wparam.0 as u32;
            let is_down = message == WM_KEYDOWN || message == WM_SYSKEYDOWN;
            let is_up = message == WM_KEYUP || message == WM_SYSKEYUP;
            if !(is_down || is_up) {
                return Ok(());
            }

            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            let event = KeyboardEvent {
                key: Key::from_vk(info.vkCode),
                is_down,
                modifiers: sample_modifiers(),
            };

            DISPATCHER.with(|slot| {
                if let Ok(slot) = slot.try_borrow() {
                    if let Some(dispatcher) = slot.as_ref() {
                        dispatcher.dispatch(event);
                    }
                }
            });
            Ok(())
        });
    }
    CallNextHookEx(HHOOK(0), code, wparam, lparam)
}

fn pressed(code: u32) -> bool {
    let state = unsafe { GetAsyncKeyState(code as i32) };
    (state as u16 & 0x8000) != 0
}

fn sample_modifiers() -> Modifiers {
    Modifiers {
        shift: pressed(vk::SHIFT) || pressed(vk::LSHIFT) || pressed(vk::RSHIFT),
        ctrl: pressed(vk::CONTROL) || pressed(vk::LCONTROL) || pressed(vk::RCONTROL),
        alt: pressed(vk::MENU) || pressed(vk::LMENU) || pressed(vk::RMENU),
        win: pressed(vk::LWIN) || pressed(vk::RWIN),
    }
}
