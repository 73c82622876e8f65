//! Passwd database lookups.

use std::ffi::{CStr, CString};
use std::{mem, ptr};

/// Name of the account owning `uid`, or `None` when there is no passwd entry.
pub fn username_for_uid(uid: u32) -> Option<String> {
    let mut buf = vec![0; 2048];
    let mut passwd = unsafe { mem::zeroed::<libc::passwd>() };
    let mut result = ptr::null_mut::<libc::passwd>();

    loop {
        let r = unsafe {
            libc::getpwuid_r(uid, &mut passwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if r != libc::ERANGE {
            break;
        }
        let newsize = buf.len().checked_mul(2)?;
        buf.resize(newsize, 0);
    }

    if result.is_null() || result != &mut passwd as *mut libc::passwd {
        return None;
    }
    read_name(&passwd)
}

/// Numeric id of the account called `name`.
pub fn uid_for_username(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    let mut buf = vec![0; 2048];
    let mut passwd = unsafe { mem::zeroed::<libc::passwd>() };
    let mut result = ptr::null_mut::<libc::passwd>();

    loop {
        let r = unsafe {
            libc::getpwnam_r(
                c_name.as_ptr(),
                &mut passwd,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };
        if r != libc::ERANGE {
            break;
        }
        let newsize = buf.len().checked_mul(2)?;
        buf.resize(newsize, 0);
    }

    // Null result means no such user, or errno was set.
    if result.is_null() || result != &mut passwd as *mut libc::passwd {
        return None;
    }
    Some(passwd.pw_uid)
}

fn read_name(passwd: &libc::passwd) -> Option<String> {
    if passwd.pw_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(passwd.pw_name) };
    Some(name.to_string_lossy().into_owned())
}

/// Uid of the running process.
pub fn current_uid() -> u32 {
    unsafe { libc::getuid() }
}
