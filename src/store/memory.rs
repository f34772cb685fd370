//! In-process store used by handler tests. Mirrors the Postgres semantics:
//! owner filtering, unique username/email, newest-first ordering.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Owner, Store, StoreError, StoreResult};
use crate::{
    auth::repo_types::{ProfileFields, User},
    diary::repo_types::{
        DiaryEntry, DiaryEntryPatch, DiaryFilter, NewDiaryEntry, NewWeightEntry, WeightEntry,
    },
    food::{
        dto::PopularFood,
        repo_types::{CustomFood, NewCustomFood},
    },
};

fn apply_profile(user: &mut User, patch: &ProfileFields, now: OffsetDateTime) {
    let p = patch.clone();
    if p.full_name.is_some() {
        user.full_name = p.full_name;
    }
    if p.age.is_some() {
        user.age = p.age;
    }
    if p.gender.is_some() {
        user.gender = p.gender;
    }
    if p.height.is_some() {
        user.height = p.height;
    }
    if p.weight.is_some() {
        user.weight = p.weight;
    }
    if p.activity_level.is_some() {
        user.activity_level = p.activity_level;
    }
    if p.goal.is_some() {
        user.goal = p.goal;
    }
    if p.target_calories.is_some() {
        user.target_calories = p.target_calories;
    }
    user.updated_at = now;
}

fn apply_diary_patch(entry: &mut DiaryEntry, patch: &DiaryEntryPatch, now: OffsetDateTime) {
    if let Some(size) = patch.serving_size {
        entry.serving_size = size;
    }
    if let Some(unit) = &patch.serving_unit {
        entry.serving_unit = unit.clone();
    }
    if let Some(nutrition) = patch.nutrition {
        entry.nutrition = nutrition;
    }
    entry.updated_at = now;
}

fn filter_matches(filter: &DiaryFilter, entry: &DiaryEntry) -> bool {
    filter.date.map_or(true, |d| entry.date == d)
        && filter.meal_type.map_or(true, |m| entry.meal_type == m)
}

/// Same grouping as the Postgres query: by `food_name`, snapshot from the
/// earliest entry, `last_used` from the latest, count desc with ties in
/// first-seen order.
fn rank_popular(mut entries: Vec<DiaryEntry>, limit: usize) -> Vec<PopularFood> {
    entries.sort_by_key(|e| e.created_at);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut ranked: Vec<PopularFood> = Vec::new();

    for entry in entries {
        match index.get(&entry.food_name) {
            Some(&i) => {
                let food = &mut ranked[i];
                food.count += 1;
                if entry.created_at > food.last_used {
                    food.last_used = entry.created_at;
                }
            }
            None => {
                index.insert(entry.food_name.clone(), ranked.len());
                ranked.push(PopularFood {
                    food_name: entry.food_name,
                    count: 1,
                    last_used: entry.created_at,
                    fdc_id: entry.fdc_id,
                    brand: entry.brand,
                    nutrition: entry.nutrition,
                });
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    diary: RwLock<Vec<DiaryEntry>>,
    custom_foods: RwLock<Vec<CustomFood>>,
    weights: RwLock<Vec<WeightEntry>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write();
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("Username"));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email"));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        patch: &ProfileFields,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write();
        Ok(users.iter_mut().find(|u| u.user_id == user_id).map(|u| {
            apply_profile(u, patch, now);
            u.clone()
        }))
    }

    async fn insert_diary_entry(
        &self,
        owner: &Owner,
        new: NewDiaryEntry,
        now: OffsetDateTime,
    ) -> StoreResult<DiaryEntry> {
        let entry = DiaryEntry::create(owner, new, now);
        self.diary.write().push(entry.clone());
        Ok(entry)
    }

    async fn list_diary_entries(
        &self,
        owner: &Owner,
        filter: DiaryFilter,
    ) -> StoreResult<Vec<DiaryEntry>> {
        // Insertion order is creation order; reversed gives newest first.
        Ok(self
            .diary
            .read()
            .iter()
            .rev()
            .filter(|e| e.user_id == owner.id() && filter_matches(&filter, e))
            .cloned()
            .collect())
    }

    async fn find_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
    ) -> StoreResult<Option<DiaryEntry>> {
        Ok(self
            .diary
            .read()
            .iter()
            .find(|e| e.entry_id == entry_id && e.user_id == owner.id())
            .cloned())
    }

    async fn update_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
        patch: &DiaryEntryPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<DiaryEntry>> {
        let mut diary = self.diary.write();
        Ok(diary
            .iter_mut()
            .find(|e| e.entry_id == entry_id && e.user_id == owner.id())
            .map(|e| {
                apply_diary_patch(e, patch, now);
                e.clone()
            }))
    }

    async fn delete_diary_entry(&self, owner: &Owner, entry_id: Uuid) -> StoreResult<bool> {
        let mut diary = self.diary.write();
        let before = diary.len();
        diary.retain(|e| !(e.entry_id == entry_id && e.user_id == owner.id()));
        Ok(diary.len() != before)
    }

    async fn popular_foods(&self, owner: &Owner, limit: i64) -> StoreResult<Vec<PopularFood>> {
        let history: Vec<DiaryEntry> = self
            .diary
            .read()
            .iter()
            .filter(|e| e.user_id == owner.id())
            .cloned()
            .collect();
        Ok(rank_popular(history, usize::try_from(limit).unwrap_or(0)))
    }

    async fn insert_custom_food(
        &self,
        owner: &Owner,
        new: NewCustomFood,
        now: OffsetDateTime,
    ) -> StoreResult<CustomFood> {
        let food = CustomFood::create(owner, new, now);
        self.custom_foods.write().push(food.clone());
        Ok(food)
    }

    async fn list_custom_foods(&self, owner: &Owner) -> StoreResult<Vec<CustomFood>> {
        Ok(self
            .custom_foods
            .read()
            .iter()
            .rev()
            .filter(|f| f.user_id == owner.id())
            .cloned()
            .collect())
    }

    async fn delete_custom_food(&self, owner: &Owner, food_id: Uuid) -> StoreResult<bool> {
        let mut foods = self.custom_foods.write();
        let before = foods.len();
        foods.retain(|f| !(f.food_id == food_id && f.user_id == owner.id()));
        Ok(foods.len() != before)
    }

    async fn insert_weight_entry(
        &self,
        owner: &Owner,
        new: NewWeightEntry,
        now: OffsetDateTime,
    ) -> StoreResult<WeightEntry> {
        let entry = WeightEntry::create(owner, new, now);
        self.weights.write().push(entry.clone());
        Ok(entry)
    }

    async fn list_weight_entries(
        &self,
        owner: &Owner,
        limit: i64,
    ) -> StoreResult<Vec<WeightEntry>> {
        let mut entries: Vec<WeightEntry> = self
            .weights
            .read()
            .iter()
            .rev()
            .filter(|w| w.user_id == owner.id())
            .cloned()
            .collect();
        // stable: same-date entries stay newest first
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diary::repo_types::MealType, nutrition::NutritionInfo};
    use time::{macros::date, Duration};

    fn user(name: &str) -> User {
        User::new(
            name.into(),
            format!("{name}@example.com"),
            "hash".into(),
            ProfileFields::default(),
            OffsetDateTime::now_utc(),
        )
    }

    fn entry(food: &str) -> NewDiaryEntry {
        NewDiaryEntry {
            date: date!(2024 - 01 - 15),
            meal_type: MealType::Lunch,
            fdc_id: None,
            food_name: food.into(),
            brand: None,
            serving_size: 1.0,
            serving_unit: "cup".into(),
            nutrition: NutritionInfo::default(),
        }
    }

    #[tokio::test]
    async fn insert_user_enforces_unique_username_and_email() {
        let store = MemoryStore::default();
        store.insert_user(&user("ann")).await.unwrap();

        let mut same_name = user("ann");
        same_name.email = "other@example.com".into();
        assert!(matches!(
            store.insert_user(&same_name).await,
            Err(StoreError::Conflict("Username"))
        ));

        let mut same_email = user("bob");
        same_email.email = "ann@example.com".into();
        assert!(matches!(
            store.insert_user(&same_email).await,
            Err(StoreError::Conflict("Email"))
        ));
    }

    #[tokio::test]
    async fn diary_operations_are_owner_scoped() {
        let store = MemoryStore::default();
        let (ann, bob) = (user("ann"), user("bob"));
        let (ann_o, bob_o) = (Owner::from(&ann), Owner::from(&bob));
        let now = OffsetDateTime::now_utc();

        let e = store.insert_diary_entry(&ann_o, entry("Soup"), now).await.unwrap();

        assert!(store.list_diary_entries(&bob_o, DiaryFilter::default()).await.unwrap().is_empty());
        assert!(store.find_diary_entry(&bob_o, e.entry_id).await.unwrap().is_none());
        assert!(store
            .update_diary_entry(&bob_o, e.entry_id, &DiaryEntryPatch::default(), now)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_diary_entry(&bob_o, e.entry_id).await.unwrap());
        assert!(store.delete_diary_entry(&ann_o, e.entry_id).await.unwrap());
    }

    fn logged(
        owner: &Owner,
        name: &str,
        fdc: Option<&str>,
        calories: f64,
        at: OffsetDateTime,
    ) -> DiaryEntry {
        let mut new = entry(name);
        new.fdc_id = fdc.map(str::to_string);
        new.nutrition.calories = calories;
        DiaryEntry::create(owner, new, at)
    }

    #[test]
    fn profile_patch_only_touches_supplied_fields() {
        let mut u = user("sarah");
        u.age = Some(28);
        let later = u.updated_at + Duration::hours(1);
        apply_profile(
            &mut u,
            &ProfileFields {
                goal: Some("lose".into()),
                ..Default::default()
            },
            later,
        );
        assert_eq!(u.goal.as_deref(), Some("lose"));
        assert_eq!(u.age, Some(28));
        assert_eq!(u.activity_level.as_deref(), Some("sedentary"));
        assert_eq!(u.updated_at, later);
    }

    #[tokio::test]
    async fn list_filters_by_date_and_meal() {
        let store = MemoryStore::default();
        let o = Owner::from(&user("ann"));
        let now = OffsetDateTime::now_utc();

        let mut dinner = entry("Pasta");
        dinner.meal_type = MealType::Dinner;
        let mut other_day = entry("Eggs");
        other_day.date = date!(2024 - 01 - 16);
        store.insert_diary_entry(&o, entry("Soup"), now).await.unwrap();
        store.insert_diary_entry(&o, dinner, now).await.unwrap();
        store.insert_diary_entry(&o, other_day, now).await.unwrap();

        let day = store
            .list_diary_entries(&o, DiaryFilter::on(date!(2024 - 01 - 15)))
            .await
            .unwrap();
        let names: Vec<&str> = day.iter().map(|e| e.food_name.as_str()).collect();
        assert_eq!(names, ["Pasta", "Soup"]);

        let lunch = DiaryFilter {
            meal_type: Some(MealType::Lunch),
            ..DiaryFilter::on(date!(2024 - 01 - 15))
        };
        let only_soup = store.list_diary_entries(&o, lunch).await.unwrap();
        assert_eq!(only_soup.len(), 1);
        assert_eq!(only_soup[0].food_name, "Soup");
    }

    #[test]
    fn empty_history_has_no_popular_foods() {
        assert!(rank_popular(Vec::new(), 10).is_empty());
    }

    #[test]
    fn popular_ranks_by_count_and_keeps_first_snapshot() {
        let o = Owner::from(&user("ann"));
        let t0 = OffsetDateTime::now_utc() - Duration::days(3);
        // newest first, the order the diary is listed in
        let entries = vec![
            logged(&o, "Apple", Some("999"), 60.0, t0 + Duration::hours(5)),
            logged(&o, "Banana", None, 105.0, t0 + Duration::hours(4)),
            logged(&o, "Apple", Some("171688"), 52.0, t0 + Duration::hours(2)),
            logged(&o, "Apple", Some("171688"), 52.0, t0),
        ];

        let ranked = rank_popular(entries, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].food_name, "Apple");
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[0].fdc_id.as_deref(), Some("171688"));
        assert_eq!(ranked[0].nutrition.calories, 52.0);
        assert_eq!(ranked[0].last_used, t0 + Duration::hours(5));
        assert_eq!(ranked[1].food_name, "Banana");
        assert_eq!(ranked[1].count, 1);
    }

    #[test]
    fn popular_ties_keep_first_seen_order_and_respect_limit() {
        let o = Owner::from(&user("ann"));
        let t0 = OffsetDateTime::now_utc() - Duration::days(1);
        let entries: Vec<DiaryEntry> = (0..12)
            .map(|i| logged(&o, &format!("food-{i:02}"), None, 1.0, t0 + Duration::minutes(i)))
            .collect();

        let ranked = rank_popular(entries, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].food_name, "food-00");
        assert_eq!(ranked[9].food_name, "food-09");
    }

    #[tokio::test]
    async fn popular_foods_are_owner_scoped() {
        let store = MemoryStore::default();
        let (ann, bob) = (Owner::from(&user("ann")), Owner::from(&user("bob")));
        store
            .insert_diary_entry(&ann, entry("Apple"), OffsetDateTime::now_utc())
            .await
            .unwrap();

        assert_eq!(store.popular_foods(&ann, 10).await.unwrap().len(), 1);
        assert!(store.popular_foods(&bob, 10).await.unwrap().is_empty());
    }
}
