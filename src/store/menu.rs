//! 菜单目录：MenuItem、品类与内置种子菜单

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 菜品品类（封闭集合）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Starter,
    Main,
    Dessert,
    Drink,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Starter => "starter",
            Category::Main => "main",
            Category::Dessert => "dessert",
            Category::Drink => "drink",
        };
        f.write_str(s)
    }
}

/// 菜品；除 available 外均为加载时常量
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Category,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub available: bool,
    pub calories: u32,
}

impl MenuItem {
    /// 不区分大小写的子串匹配：名称、描述或任一标签包含 query 即命中
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

#[allow(clippy::too_many_arguments)]
fn item(
    id: &str,
    name: &str,
    description: &str,
    price_cents: i64,
    category: Category,
    ingredients: &[&str],
    tags: &[&str],
    calories: u32,
    image_seed: u32,
) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        price: Decimal::new(price_cents, 2),
        category,
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
        image: Some(format!("https://picsum.photos/400/300?random={image_seed}")),
        available: true,
        calories,
    }
}

/// 内置种子菜单（m1..m7），按加载顺序排列
pub fn seed_menu() -> Vec<MenuItem> {
    vec![
        item(
            "m1",
            "Nebula Burger",
            "A succulent wagyu beef patty topped with caramelized onion jam, smoked gouda, and truffle aioli on a brioche bun.",
            1899,
            Category::Main,
            &["wagyu beef", "onion jam", "smoked gouda", "truffle aioli", "brioche bun"],
            &["meat", "gourmet", "popular"],
            850,
            1,
        ),
        item(
            "m2",
            "Quantum Quinoa Salad",
            "Organic quinoa mixed with roasted beets, kale, walnuts, and a zesty lemon-tahini dressing.",
            1450,
            Category::Main,
            &["quinoa", "beets", "kale", "walnuts", "lemon", "tahini"],
            &["vegan", "gluten-free", "healthy"],
            420,
            2,
        ),
        item(
            "m3",
            "Cyber Spicy Noodles",
            "Hand-pulled noodles tossed in a fiery chili oil sauce with minced pork and bok choy.",
            1600,
            Category::Main,
            &["wheat noodles", "chili oil", "pork", "bok choy", "garlic"],
            &["spicy", "comfort-food"],
            680,
            3,
        ),
        item(
            "m4",
            "Binary Bites (Truffle Fries)",
            "Crispy shoestring fries tossed with parmesan cheese, parsley, and white truffle oil.",
            899,
            Category::Starter,
            &["potatoes", "parmesan", "truffle oil", "parsley"],
            &["vegetarian", "shareable"],
            550,
            4,
        ),
        item(
            "m5",
            "Plasma Prawns",
            "Grilled tiger prawns served with a spicy mango salsa and lime wedges.",
            1599,
            Category::Starter,
            &["tiger prawns", "mango", "chili", "lime", "cilantro"],
            &["seafood", "gluten-free", "spicy"],
            320,
            5,
        ),
        item(
            "m6",
            "Zero-G Cheesecake",
            "A light and airy japanese-style cheesecake topped with berry compote.",
            950,
            Category::Dessert,
            &["cream cheese", "eggs", "sugar", "berries"],
            &["sweet", "vegetarian"],
            400,
            6,
        ),
        item(
            "m7",
            "Neural Nectar",
            "A refreshing blend of cucumber, mint, lime, and agave syrup.",
            650,
            Category::Drink,
            &["cucumber", "mint", "lime", "agave"],
            &["vegan", "non-alcoholic"],
            120,
            7,
        ),
    ]
}
