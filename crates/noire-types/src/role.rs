use serde::{Deserialize, Serialize};

/// Numeric rank levels used by every review and visibility check.
pub mod hierarchy {
    pub const CITIZEN: i32 = 0;
    pub const CADET: i32 = 1;
    pub const OFFICER: i32 = 2;
    pub const DETECTIVE: i32 = 3;
    pub const SERGEANT: i32 = 4;
    pub const CAPTAIN: i32 = 5;
    pub const CHIEF: i32 = 6;
}

/// A role a user can hold.
///
/// Police ranks are ordered by [`Role::hierarchy`]. `Judge` sits outside the
/// police chain (level 0) and `Administrator` acts with chief authority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    BaseUser,
    Judge,
    Cadet,
    PatrolOfficer,
    PoliceOfficer,
    Detective,
    Sergeant,
    Captain,
    Chief,
    Administrator,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::BaseUser,
        Role::Judge,
        Role::Cadet,
        Role::PatrolOfficer,
        Role::PoliceOfficer,
        Role::Detective,
        Role::Sergeant,
        Role::Captain,
        Role::Chief,
        Role::Administrator,
    ];

    /// Resolve a role from any spelling seen in the wild
    /// (`police_officer`, `Police Officer`, `police-officer`, `Officer`).
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize_role_name(name).as_str() {
            "base_user" | "citizen" | "complainant" | "witness" | "suspect" => Some(Role::BaseUser),
            "judge" => Some(Role::Judge),
            "cadet" => Some(Role::Cadet),
            "patrol_officer" => Some(Role::PatrolOfficer),
            "police_officer" | "officer" => Some(Role::PoliceOfficer),
            "detective" => Some(Role::Detective),
            "sergeant" => Some(Role::Sergeant),
            "captain" => Some(Role::Captain),
            "chief" | "police_chief" => Some(Role::Chief),
            "administrator" | "admin" => Some(Role::Administrator),
            _ => None,
        }
    }

    /// Canonical storage / token spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BaseUser => "base_user",
            Role::Judge => "judge",
            Role::Cadet => "cadet",
            Role::PatrolOfficer => "patrol_officer",
            Role::PoliceOfficer => "police_officer",
            Role::Detective => "detective",
            Role::Sergeant => "sergeant",
            Role::Captain => "captain",
            Role::Chief => "chief",
            Role::Administrator => "administrator",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::BaseUser => "Base User",
            Role::Judge => "Judge",
            Role::Cadet => "Cadet",
            Role::PatrolOfficer => "Patrol Officer",
            Role::PoliceOfficer => "Police Officer",
            Role::Detective => "Detective",
            Role::Sergeant => "Sergeant",
            Role::Captain => "Captain",
            Role::Chief => "Police Chief",
            Role::Administrator => "Administrator",
        }
    }

    pub fn hierarchy(&self) -> i32 {
        match self {
            Role::BaseUser | Role::Judge => hierarchy::CITIZEN,
            Role::Cadet => hierarchy::CADET,
            Role::PatrolOfficer | Role::PoliceOfficer => hierarchy::OFFICER,
            Role::Detective => hierarchy::DETECTIVE,
            Role::Sergeant => hierarchy::SERGEANT,
            Role::Captain => hierarchy::CAPTAIN,
            Role::Chief | Role::Administrator => hierarchy::CHIEF,
        }
    }
}

/// Lowercase, trim, and fold spaces/hyphens into underscores.
pub fn normalize_role_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Human-readable name of the lowest rank holding `level`.
pub fn rank_name(level: i32) -> &'static str {
    match level {
        l if l >= hierarchy::CHIEF => "Police Chief",
        hierarchy::CAPTAIN => "Captain",
        hierarchy::SERGEANT => "Sergeant",
        hierarchy::DETECTIVE => "Detective",
        hierarchy::OFFICER => "Police Officer",
        hierarchy::CADET => "Cadet",
        _ => "Base User",
    }
}

/// The resolved roles of one user plus their effective hierarchy level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Resolve role names, dropping anything unrecognised.
    /// A user without a recognised role is a base user.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles: Vec<Role> = names
            .into_iter()
            .filter_map(|n| Role::from_name(n.as_ref()))
            .collect();
        roles.sort();
        roles.dedup();
        if roles.is_empty() {
            roles.push(Role::BaseUser);
        }
        Self { roles }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }

    /// Maximum hierarchy level among the held roles.
    pub fn hierarchy(&self) -> i32 {
        self.roles
            .iter()
            .map(Role::hierarchy)
            .max()
            .unwrap_or(hierarchy::CITIZEN)
    }

    /// The highest-ranking role held, used when recording who acted.
    pub fn primary(&self) -> Role {
        self.roles
            .iter()
            .copied()
            .max_by_key(|r| (r.hierarchy(), *r))
            .unwrap_or(Role::BaseUser)
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has(Role::Administrator)
    }

    pub fn is_judge(&self) -> bool {
        self.has(Role::Judge)
    }

    /// Any police rank from cadet upward.
    pub fn is_police(&self) -> bool {
        self.hierarchy() >= hierarchy::CADET
    }

    pub fn at_least(&self, level: i32) -> bool {
        self.hierarchy() >= level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_normalized_centrally() {
        assert_eq!(Role::from_name("police_officer"), Some(Role::PoliceOfficer));
        assert_eq!(Role::from_name("Police Officer"), Some(Role::PoliceOfficer));
        assert_eq!(Role::from_name("  police-officer "), Some(Role::PoliceOfficer));
        assert_eq!(Role::from_name("POLICE  OFFICER"), Some(Role::PoliceOfficer));
        assert_eq!(Role::from_name("Patrol Officer"), Some(Role::PatrolOfficer));
        assert_eq!(Role::from_name("Police Chief"), Some(Role::Chief));
        assert_eq!(Role::from_name("Base User"), Some(Role::BaseUser));
        assert_eq!(Role::from_name("janitor"), None);
    }

    #[test]
    fn canonical_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.as_str()), Some(role));
            assert_eq!(Role::from_name(role.display_name()), Some(role));
        }
    }

    #[test]
    fn hierarchy_is_strictly_ordered_along_the_police_chain() {
        let chain = [
            Role::BaseUser,
            Role::Cadet,
            Role::PoliceOfficer,
            Role::Detective,
            Role::Sergeant,
            Role::Captain,
            Role::Chief,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].hierarchy() < pair[1].hierarchy(), "{:?}", pair);
        }
        assert_eq!(Role::PatrolOfficer.hierarchy(), Role::PoliceOfficer.hierarchy());
    }

    #[test]
    fn role_set_takes_max_hierarchy() {
        let set = RoleSet::from_names(["base_user", "Detective", "cadet"]);
        assert_eq!(set.hierarchy(), hierarchy::DETECTIVE);
        assert_eq!(set.primary(), Role::Detective);
        assert!(set.is_police());
        assert!(!set.is_admin());
    }

    #[test]
    fn unknown_roles_never_grant_authority() {
        let set = RoleSet::from_names(["superuser", "root"]);
        assert_eq!(set.roles(), &[Role::BaseUser]);
        assert_eq!(set.hierarchy(), hierarchy::CITIZEN);
        assert!(!set.is_police());
    }

    #[test]
    fn duplicate_spellings_collapse() {
        let set = RoleSet::from_names(["police_officer", "Police Officer", "officer"]);
        assert_eq!(set.roles(), &[Role::PoliceOfficer]);
        assert_eq!(set.names(), vec!["police_officer".to_string()]);
    }

    #[test]
    fn administrator_acts_with_chief_authority() {
        let set = RoleSet::from_names(["admin"]);
        assert!(set.is_admin());
        assert_eq!(set.hierarchy(), hierarchy::CHIEF);
    }

    #[test]
    fn judge_is_not_police() {
        let set = RoleSet::from_names(["judge"]);
        assert!(set.is_judge());
        assert!(!set.is_police());
    }

    #[test]
    fn rank_names() {
        assert_eq!(rank_name(hierarchy::CAPTAIN), "Captain");
        assert_eq!(rank_name(hierarchy::CHIEF), "Police Chief");
        assert_eq!(rank_name(0), "Base User");
    }
}
