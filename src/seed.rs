//! Development seed data.

use chrono::{Duration, Utc};

use crate::auth::hash_password;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{CreateArgumentRequest, CreateDebateRequest, Position, UpdateProfileRequest};

/// Debate categories offered by the create form and the category tabs.
pub const CATEGORIES: [&str; 10] = [
    "Technology",
    "Politics",
    "Science",
    "Economics",
    "Social Issues",
    "Philosophy",
    "Environment",
    "Education",
    "Healthcare",
    "International Relations",
];

/// Password shared by all seeded accounts.
pub const SEED_PASSWORD: &str = "eliteminds-dev";

struct SeedUser {
    username: &'static str,
    email: &'static str,
    full_name: &'static str,
    location: &'static str,
    bio: &'static str,
    expertise: &'static [&'static str],
}

const USERS: [SeedUser; 4] = [
    SeedUser {
        username: "sophialogic",
        email: "sophia@example.com",
        full_name: "Sophia Chen",
        location: "San Francisco, CA",
        bio: "Tech ethicist and AI researcher with a passion for thoughtful debate on emerging technologies.",
        expertise: &["AI Ethics", "Technology", "Philosophy"],
    },
    SeedUser {
        username: "marcus_aurelius",
        email: "marcus@example.com",
        full_name: "Marcus Johnson",
        location: "Chicago, IL",
        bio: "Political scientist specializing in comparative politics. I believe in evidence-based discourse.",
        expertise: &["Politics", "History", "International Relations"],
    },
    SeedUser {
        username: "quantum_clara",
        email: "clara@example.com",
        full_name: "Clara Oswald",
        location: "Boston, MA",
        bio: "Physicist exploring the frontiers of quantum mechanics and its philosophical implications.",
        expertise: &["Physics", "Science", "Quantum Theory"],
    },
    SeedUser {
        username: "ethical_techie",
        email: "james@example.com",
        full_name: "James Wilson",
        location: "Austin, TX",
        bio: "Software engineer concerned with the societal impacts of technology. Advocate for digital rights.",
        expertise: &["Technology", "Ethics", "Privacy"],
    },
];

/// (creator index, title, description, category, featured)
const DEBATES: [(usize, &str, &str, &str, bool); 5] = [
    (
        0,
        "Should AI development be regulated by international law?",
        "As artificial intelligence capabilities advance rapidly, should we implement international legal frameworks to govern its development and deployment?",
        "Technology",
        true,
    ),
    (
        2,
        "Is universal basic income a viable solution to automation-induced unemployment?",
        "As automation replaces jobs across various sectors, would universal basic income effectively address the resulting economic disruption?",
        "Economics",
        false,
    ),
    (
        3,
        "Should social media platforms be responsible for moderating misinformation?",
        "Should social media companies be legally obligated to moderate content on their platforms? Where is the line between free speech and harmful content?",
        "Social Issues",
        true,
    ),
    (
        1,
        "Is nuclear energy the solution to climate change?",
        "Given the urgent need to reduce carbon emissions, should we invest more heavily in nuclear power as a clean energy alternative?",
        "Science",
        false,
    ),
    (
        1,
        "Should voting be mandatory in democratic countries?",
        "Would compulsory voting strengthen democratic participation or undermine freedom of choice?",
        "Politics",
        false,
    ),
];

/// (author index, position, content) for the first debate.
const ARGUMENTS: [(usize, Position, &str); 4] = [
    (
        3,
        Position::For,
        "International AI regulation is essential to prevent a race to the bottom in safety standards.",
    ),
    (
        2,
        Position::Against,
        "Premature regulation would stifle innovation and advantage countries that don't comply.",
    ),
    (
        1,
        Position::For,
        "Effective regulation doesn't mean stopping innovation; it means directing it responsibly.",
    ),
    (
        0,
        Position::Against,
        "By the time consensus is reached, the technology will have advanced beyond the framework.",
    ),
];

/// Load demo accounts, debates and arguments when no debate exists yet.
///
/// Returns whether anything was written.
pub async fn seed_if_empty(repo: &Repository) -> Result<bool, AppError> {
    if repo.count_debates().await? > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(SEED_PASSWORD).await?;
    let mut user_ids = Vec::with_capacity(USERS.len());
    for user in &USERS {
        let profile = match repo.get_profile_by_username(user.username).await? {
            Some(existing) => existing,
            None => {
                repo.create_account(user.email, &password_hash, user.username, Some(user.full_name))
                    .await?
            }
        };
        repo.update_profile(
            &profile.id,
            &UpdateProfileRequest {
                bio: Some(user.bio.to_string()),
                location: Some(user.location.to_string()),
                expertise_areas: Some(user.expertise.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            },
        )
        .await?;
        user_ids.push(profile.id);
    }

    let now = Utc::now();
    let mut debate_ids = Vec::with_capacity(DEBATES.len());
    for (offset, (creator, title, description, category, featured)) in DEBATES.iter().enumerate() {
        let created_at = now - Duration::days(DEBATES.len() as i64 - offset as i64);
        let debate = repo
            .insert_debate_at(
                &user_ids[*creator],
                &CreateDebateRequest {
                    title: title.to_string(),
                    description: description.to_string(),
                    category: category.to_string(),
                    created_at: Some(created_at),
                    ends_at: created_at + Duration::days(14),
                },
                created_at,
            )
            .await?;
        if *featured {
            repo.set_featured(&debate.id, true).await?;
        }
        debate_ids.push(debate.id);
    }

    for (author, position, content) in &ARGUMENTS {
        repo.create_argument(
            &debate_ids[0],
            &user_ids[*author],
            &CreateArgumentRequest {
                position: *position,
                content: content.to_string(),
            },
        )
        .await?;
    }

    tracing::info!(
        users = user_ids.len(),
        debates = debate_ids.len(),
        arguments = ARGUMENTS.len(),
        "Seeded development data"
    );
    Ok(true)
}
