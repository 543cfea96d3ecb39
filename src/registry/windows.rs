//! Live registry backend.
//!
//! Wraps the Win32 registry and Kernel Transaction Manager APIs in scoped
//! resources: a [`WinKey`] closes its handle on drop, and a [`WinTxn`]
//! dropped without commit closes its transaction handle uncommitted, which
//! the kernel treats as a rollback.

use std::ptr;

use log::debug;
use widestring::{U16CStr, U16CString};

use winapi::shared::minwindef::{DWORD, HKEY};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::ktmw32::{CommitTransaction, CreateTransaction};
use winapi::um::libloaderapi::{
    GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
    GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
};
use winapi::um::winnt::{
    HANDLE, KEY_CREATE_SUB_KEY, KEY_QUERY_VALUE, KEY_SET_VALUE, REG_DWORD, REG_MULTI_SZ,
    REG_OPTION_NON_VOLATILE, REG_SZ,
};
use winapi::um::winreg::{
    RegCloseKey, RegCreateKeyTransactedW, RegDeleteTreeW, RegGetValueW, RegOpenKeyExW,
    RegSetValueExW, HKEY_LOCAL_MACHINE, RRF_RT_REG_MULTI_SZ,
};

use crate::err::{Error, Result};
use crate::registry::{RegValue, Registry, ERROR_FILE_NOT_FOUND};
use crate::wide;

const ERROR_MORE_DATA: u32 = 234;

/// An open registry key handle, closed on drop.
#[derive(Debug)]
pub struct WinKey {
    handle: HKEY,
}

impl Drop for WinKey {
    fn drop(&mut self) {
        unsafe {
            RegCloseKey(self.handle);
        }
    }
}

/// A kernel transaction handle. Dropping it without [`Registry::commit`]
/// closes the handle uncommitted, rolling the transaction back.
#[derive(Debug)]
pub struct WinTxn {
    handle: HANDLE,
}

impl Drop for WinTxn {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

/// The machine hive of the live registry.
#[derive(Debug, Default)]
pub struct WinRegistry;

fn last_os_error(operation: &'static str) -> Error {
    Error::Registry {
        operation,
        code: unsafe { GetLastError() },
    }
}

fn check_status(operation: &'static str, status: i32) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::Registry {
            operation,
            code: status as u32,
        })
    }
}

fn value_name(name: &str) -> Result<U16CString> {
    wide::to_wide(name)
}

fn set_value_on(handle: HKEY, name: &str, value: RegValue<'_>) -> Result<()> {
    let name = value_name(name)?;
    let (value_type, data, size) = match value {
        RegValue::Dword(ref v) => (
            REG_DWORD,
            v as *const u32 as *const u8,
            std::mem::size_of::<u32>(),
        ),
        RegValue::Sz(s) => (
            REG_SZ,
            s.as_ptr() as *const u8,
            (s.len() + 1) * std::mem::size_of::<u16>(),
        ),
        RegValue::MultiSz(units) => (
            REG_MULTI_SZ,
            units.as_ptr() as *const u8,
            std::mem::size_of_val(units),
        ),
    };

    let status = unsafe {
        RegSetValueExW(handle, name.as_ptr(), 0, value_type, data, size as DWORD)
    };
    check_status("RegSetValueExW", status)
}

impl Registry for WinRegistry {
    type Key = WinKey;
    type Txn = WinTxn;

    fn open_key(&self, path: &U16CStr) -> Result<Option<WinKey>> {
        let mut handle: HKEY = ptr::null_mut();
        let status = unsafe {
            RegOpenKeyExW(
                HKEY_LOCAL_MACHINE,
                path.as_ptr(),
                0,
                KEY_QUERY_VALUE | KEY_SET_VALUE | KEY_CREATE_SUB_KEY,
                &mut handle,
            )
        };

        match status as u32 {
            0 => Ok(Some(WinKey { handle })),
            ERROR_FILE_NOT_FOUND => Ok(None),
            code => Err(Error::Registry {
                operation: "RegOpenKeyExW",
                code,
            }),
        }
    }

    fn read_multi_sz(&self, key: &WinKey, name: &str) -> Result<Vec<u16>> {
        let name = value_name(name)?;
        let mut buffer = vec![0_u16; 256];
        let mut size = std::mem::size_of_val(buffer.as_slice()) as DWORD;

        let mut status = unsafe {
            RegGetValueW(
                key.handle,
                ptr::null(),
                name.as_ptr(),
                RRF_RT_REG_MULTI_SZ,
                ptr::null_mut(),
                buffer.as_mut_ptr() as *mut _,
                &mut size,
            )
        };

        // One retry with the size the first call reported.
        if status as u32 == ERROR_MORE_DATA {
            buffer = vec![0_u16; size as usize / 2];
            status = unsafe {
                RegGetValueW(
                    key.handle,
                    ptr::null(),
                    name.as_ptr(),
                    RRF_RT_REG_MULTI_SZ,
                    ptr::null_mut(),
                    buffer.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
        }
        check_status("RegGetValueW", status)?;

        buffer.truncate(size as usize / 2);
        Ok(buffer)
    }

    fn set_value(&self, key: &WinKey, name: &str, value: RegValue<'_>) -> Result<()> {
        set_value_on(key.handle, name, value)
    }

    fn begin(&self, description: &str) -> Result<WinTxn> {
        let description = wide::to_wide(description)?;
        let handle = unsafe {
            CreateTransaction(
                ptr::null_mut(),
                ptr::null_mut(),
                0,
                0,
                0,
                0,
                description.as_ptr() as *mut _,
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(last_os_error("CreateTransaction"));
        }
        debug!("opened registry transaction: {description:?}");
        Ok(WinTxn { handle })
    }

    fn create_key(&self, txn: &mut WinTxn, path: &U16CStr) -> Result<WinKey> {
        transacted_create(txn, HKEY_LOCAL_MACHINE, path)
    }

    fn create_subkey(&self, txn: &mut WinTxn, parent: &WinKey, name: &U16CStr) -> Result<WinKey> {
        transacted_create(txn, parent.handle, name)
    }

    fn set_value_txn(
        &self,
        _txn: &mut WinTxn,
        key: &WinKey,
        name: &str,
        value: RegValue<'_>,
    ) -> Result<()> {
        // Writes through a transacted key handle are part of its
        // transaction; no separate association is needed.
        set_value_on(key.handle, name, value)
    }

    fn commit(&self, txn: WinTxn) -> Result<()> {
        let committed = unsafe { CommitTransaction(txn.handle) };
        if committed == 0 {
            return Err(last_os_error("CommitTransaction"));
        }
        Ok(())
    }

    fn delete_tree(&self, path: &U16CStr) -> Result<()> {
        let status = unsafe { RegDeleteTreeW(HKEY_LOCAL_MACHINE, path.as_ptr()) };
        check_status("RegDeleteTreeW", status)
    }
}

fn transacted_create(txn: &WinTxn, parent: HKEY, path: &U16CStr) -> Result<WinKey> {
    let mut handle: HKEY = ptr::null_mut();
    let status = unsafe {
        RegCreateKeyTransactedW(
            parent,
            path.as_ptr(),
            0,
            ptr::null_mut(),
            REG_OPTION_NON_VOLATILE,
            KEY_CREATE_SUB_KEY | KEY_SET_VALUE,
            ptr::null_mut(),
            &mut handle,
            ptr::null_mut(),
            txn.handle,
            ptr::null_mut(),
        )
    };
    check_status("RegCreateKeyTransactedW", status)?;
    Ok(WinKey { handle })
}

/// Resolves the file path of the module this crate is linked into, which is
/// the path the default source's message-file values point at.
pub fn installing_module_path() -> Result<String> {
    use winapi::shared::minwindef::{HMODULE, MAX_PATH};

    let mut module: HMODULE = ptr::null_mut();
    let anchored = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            installing_module_path as *const () as *const u16,
            &mut module,
        )
    };
    if anchored == 0 {
        return Err(last_os_error("GetModuleHandleExW"));
    }

    let mut buffer = [0_u16; MAX_PATH];
    let length = unsafe { GetModuleFileNameW(module, buffer.as_mut_ptr(), MAX_PATH as DWORD) };
    if length == 0 {
        return Err(last_os_error("GetModuleFileNameW"));
    }

    let path = U16CString::from_vec(buffer[..length as usize].to_vec())
        .map_err(|source| Error::WideEncoding { source })?;
    wide::to_utf8(&path)
}
