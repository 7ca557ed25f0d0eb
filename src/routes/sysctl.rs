// Kernel routing table reader
//
// The dump is a two-step sysctl: ask for the size, then fetch. The table
// may grow in between, so the buffer is doubled and the whole exchange
// retried when the kernel still reports ENOMEM.

use std::io;

use super::AddressFamily;
use crate::config::ResolverConfig;
use crate::error::{RouteError, RouteResult, is_buffer_too_small};

/// Something that produces raw routing table dumps
pub trait TableSource: Send + Sync {
    fn dump(&self, family: AddressFamily) -> RouteResult<Vec<u8>>;
}

/// The two system calls behind a dump
pub trait RouteSysctl: Send + Sync {
    /// Bytes currently needed to hold the table
    fn estimate(&self, family: AddressFamily) -> io::Result<usize>;

    /// Fill `buf`, returning the number of bytes written
    fn fetch(&self, family: AddressFamily, buf: &mut [u8]) -> io::Result<usize>;
}

/// Size-then-fetch dump with a bounded number of attempts
pub struct KernelTableSource<K> {
    sysctl: K,
    max_attempts: u32,
}

impl<K: RouteSysctl> KernelTableSource<K> {
    pub fn new(sysctl: K, max_attempts: u32) -> Self {
        KernelTableSource {
            sysctl,
            max_attempts,
        }
    }
}

impl<K: RouteSysctl> TableSource for KernelTableSource<K> {
    fn dump(&self, family: AddressFamily) -> RouteResult<Vec<u8>> {
        let mut buf = Vec::new();

        for attempt in 1..=self.max_attempts {
            let estimate = self
                .sysctl
                .estimate(family)
                .map_err(RouteError::estimate)?;
            let size = estimate
                .checked_mul(2)
                .ok_or(RouteError::TableTooLarge(estimate))?;
            buf.resize(size, 0);

            match self.sysctl.fetch(family, &mut buf) {
                Ok(written) => {
                    buf.truncate(written);
                    if attempt > 1 {
                        tracing::debug!(
                            "{} routing table dump succeeded after {} attempt(s)",
                            family,
                            attempt
                        );
                    }
                    return Ok(buf);
                }
                Err(e) if is_buffer_too_small(&e) => {
                    tracing::debug!(
                        "{} routing table grew during dump (attempt {}/{})",
                        family,
                        attempt,
                        self.max_attempts
                    );
                }
                Err(e) => return Err(RouteError::dump(e)),
            }
        }

        Err(RouteError::OutOfAttempts(self.max_attempts))
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use darwin::Sysctl;

#[cfg(any(target_os = "macos", target_os = "ios"))]
mod darwin {
    use std::io;
    use std::ptr;

    use super::RouteSysctl;
    use crate::routes::AddressFamily;

    const NET_RT_DUMP2: libc::c_int = 7;

    /// `sysctl(CTL_NET, PF_ROUTE, 0, family, NET_RT_DUMP2, 0)`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Sysctl;

    fn mib(family: AddressFamily) -> [libc::c_int; 6] {
        [
            libc::CTL_NET,
            libc::PF_ROUTE,
            0,
            family.sa_family() as libc::c_int,
            NET_RT_DUMP2,
            0,
        ]
    }

    fn sysctl(
        family: AddressFamily,
        out: *mut libc::c_void,
        size: &mut libc::size_t,
    ) -> io::Result<()> {
        let mut name = mib(family);
        // SAFETY: name outlives the call; out is null or points at `*size` writable bytes
        let rc = unsafe {
            libc::sysctl(
                name.as_mut_ptr(),
                name.len() as libc::c_uint,
                out,
                size,
                ptr::null_mut(),
                0,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    impl RouteSysctl for Sysctl {
        fn estimate(&self, family: AddressFamily) -> io::Result<usize> {
            let mut size: libc::size_t = 0;
            sysctl(family, ptr::null_mut(), &mut size)?;
            Ok(size)
        }

        fn fetch(&self, family: AddressFamily, buf: &mut [u8]) -> io::Result<usize> {
            let mut size: libc::size_t = buf.len();
            sysctl(family, buf.as_mut_ptr().cast(), &mut size)?;
            Ok(size.min(buf.len()))
        }
    }
}

/// Table source backed by the running kernel
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn system_source(config: &ResolverConfig) -> RouteResult<KernelTableSource<Sysctl>> {
    Ok(KernelTableSource::new(Sysctl, config.max_dump_attempts))
}

/// Table source backed by the running kernel
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub fn system_source(config: &ResolverConfig) -> RouteResult<KernelTableSource<Unsupported>> {
    let _ = config;
    Err(RouteError::Unsupported)
}

/// Placeholder for platforms without a routing socket dump
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub enum Unsupported {}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
impl RouteSysctl for Unsupported {
    fn estimate(&self, _family: AddressFamily) -> io::Result<usize> {
        match *self {}
    }

    fn fetch(&self, _family: AddressFamily, _buf: &mut [u8]) -> io::Result<usize> {
        match *self {}
    }
}
