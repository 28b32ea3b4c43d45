use uuid::Uuid;

/// The outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
	Allowed,
	Denied,
}

/// Checks whether `requester` may mutate a resource owned by `owner`.
///
/// Reading never goes through here; only writes are gated. An absent requester
/// (not logged in) is always denied.
pub fn authorize(requester: Option<Uuid>, owner: Uuid) -> Access {
	match requester {
		Some(requester) if requester == owner => Access::Allowed,
		_ => Access::Denied,
	}
}
