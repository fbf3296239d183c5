use crate::models::dao::DaoPolicy;

/// Member count derived from a policy: sum of every `Group` role's size.
/// Roles of other kinds contribute nothing; no policy means zero members.
pub fn member_count(policy: Option<&DaoPolicy>) -> u64 {
    let Some(policy) = policy else {
        return 0;
    };
    policy
        .roles
        .iter()
        .map(|role| role.kind.group_size() as u64)
        .sum()
}

/// Human-readable name from a contract id:
/// `marketing.sputnik-dao.near` → `Marketing`, `near-dev.sputnik-dao.near` → `Near dev`.
pub fn dao_display_name(dao_id: &str) -> String {
    let first = dao_id.split('.').next().unwrap_or(dao_id);
    if first.is_empty() {
        return dao_id.to_string();
    }

    let mut chars = first.chars();
    match chars.next() {
        Some(head) => {
            let rest: String = chars.collect();
            format!("{}{}", head.to_uppercase(), rest.replace('-', " "))
        }
        None => dao_id.to_string(),
    }
}
