use middleware::global::GlobalLimiter;

pub mod middleware {
    pub mod global;
}

/// Process-wide request budget, shared by every worker.
pub fn global_middleware(permits_per_second: u32) -> GlobalLimiter {
    GlobalLimiter::new(permits_per_second)
}
