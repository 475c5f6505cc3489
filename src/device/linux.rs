use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr;

use super::PassthroughCommand;
use crate::ata::{CDB_LEN, SENSE_LEN};

// <linux/fs.h>
const BLKRASET: u64 = 0x1262;
const BLKRAGET: u64 = 0x1263;
const BLKFLSBUF: u64 = 0x1261;
#[cfg(target_pointer_width = "64")]
const BLKGETSIZE64: u64 = 0x8008_1272;
#[cfg(not(target_pointer_width = "64"))]
const BLKGETSIZE64: u64 = 0x8004_1272;

// <scsi/sg.h>
const SG_IO: u64 = 0x2285;
const SG_DXFER_NONE: libc::c_int = -1;

#[repr(C)]
struct SgIoHdr {
    interface_id: libc::c_int,
    dxfer_direction: libc::c_int,
    cmd_len: libc::c_uchar,
    mx_sb_len: libc::c_uchar,
    iovec_count: libc::c_ushort,
    dxfer_len: libc::c_uint,
    dxferp: *mut libc::c_void,
    cmdp: *mut libc::c_uchar,
    sbp: *mut libc::c_uchar,
    timeout: libc::c_uint,
    flags: libc::c_uint,
    pack_id: libc::c_int,
    usr_ptr: *mut libc::c_void,
    status: libc::c_uchar,
    masked_status: libc::c_uchar,
    msg_status: libc::c_uchar,
    sb_len_wr: libc::c_uchar,
    host_status: libc::c_ushort,
    driver_status: libc::c_ushort,
    resid: libc::c_int,
    duration: libc::c_uint,
    info: libc::c_uint,
}

fn check(ret: libc::c_int) -> io::Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub fn direct_read_flags(opts: &mut OpenOptions) {
    opts.custom_flags(libc::O_DIRECT | libc::O_LARGEFILE | libc::O_NOATIME);
}

pub fn block_size_bytes(f: &File) -> io::Result<u64> {
    let mut size: u64 = 0;
    check(unsafe { libc::ioctl(f.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) })?;
    Ok(size)
}

pub fn flush_buffers(f: &File) -> io::Result<()> {
    check(unsafe { libc::ioctl(f.as_raw_fd(), BLKFLSBUF as _, ptr::null_mut::<libc::c_void>()) })
}

pub fn readahead(f: &File) -> io::Result<u64> {
    let mut ra: libc::c_long = 0;
    check(unsafe { libc::ioctl(f.as_raw_fd(), BLKRAGET as _, &mut ra as *mut libc::c_long) })?;
    Ok(ra as u64)
}

pub fn set_readahead(f: &File, sectors: u64) -> io::Result<()> {
    check(unsafe { libc::ioctl(f.as_raw_fd(), BLKRASET as _, sectors as libc::c_ulong) })
}

pub fn sg_io(f: &File, cmd: &mut PassthroughCommand) -> io::Result<()> {
    let mut hdr = SgIoHdr {
        interface_id: b'S' as libc::c_int,
        dxfer_direction: SG_DXFER_NONE,
        cmd_len: CDB_LEN as libc::c_uchar,
        mx_sb_len: SENSE_LEN as libc::c_uchar,
        iovec_count: 0,
        dxfer_len: 0,
        dxferp: ptr::null_mut(),
        cmdp: cmd.cdb.as_mut_ptr(),
        sbp: cmd.sense.as_mut_ptr(),
        timeout: cmd.timeout_ms,
        flags: 0,
        pack_id: 0,
        usr_ptr: ptr::null_mut(),
        status: 0,
        masked_status: 0,
        msg_status: 0,
        sb_len_wr: 0,
        host_status: 0,
        driver_status: 0,
        resid: 0,
        duration: 0,
        info: 0,
    };
    let ret = unsafe { libc::ioctl(f.as_raw_fd(), SG_IO as _, &mut hdr as *mut SgIoHdr) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    cmd.status = hdr.status;
    cmd.host_status = hdr.host_status;
    cmd.driver_status = hdr.driver_status;
    cmd.sense_len_written = hdr.sb_len_wr;
    cmd.duration_ms = hdr.duration;
    Ok(())
}
