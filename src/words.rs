//! Word-pair catalog
//!
//! Supplies `(civil, imposter, category)` tuples for each round. The builtin
//! catalog is a fixed list; draws are uniform over the entries whose words
//! have not been seen yet in the room.

use crate::rng::GameRng;
use crate::types::{Difficulty, WordPair};

/// Source of word pairs for `START_GAME`
pub trait WordCatalog: Send + Sync {
    /// Draw one pair, avoiding `exclude` while alternatives remain
    fn draw(&self, exclude: &[String], rng: &mut GameRng) -> WordPair;
}

/// The catalog shipped with the game
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    pairs: Vec<WordPair>,
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        Self {
            pairs: builtin_pairs(),
        }
    }

    /// Restrict to one difficulty level. An unknown level keeps the full list.
    pub fn with_difficulty(difficulty: Option<Difficulty>) -> Self {
        let mut catalog = Self::new();
        if let Some(level) = difficulty {
            let filtered: Vec<WordPair> = catalog
                .pairs
                .iter()
                .filter(|p| p.difficulty == level)
                .cloned()
                .collect();
            if !filtered.is_empty() {
                catalog.pairs = filtered;
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for pair in &self.pairs {
            if !out.contains(&pair.category.as_str()) {
                out.push(&pair.category);
            }
        }
        out
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl WordCatalog for BuiltinCatalog {
    fn draw(&self, exclude: &[String], rng: &mut GameRng) -> WordPair {
        draw_word_pair(&self.pairs, exclude, rng)
    }
}

/// Uniformly pick a pair whose words are both absent from `exclude`,
/// falling back to the whole list once everything has been seen.
pub fn draw_word_pair(pairs: &[WordPair], exclude: &[String], rng: &mut GameRng) -> WordPair {
    let available: Vec<&WordPair> = pairs
        .iter()
        .filter(|p| !exclude.contains(&p.civil) && !exclude.contains(&p.imposter))
        .collect();

    let pick = if available.is_empty() {
        rng.choose(pairs)
    } else {
        rng.choose(&available).copied()
    };

    match pick {
        Some(pair) => pair.clone(),
        None => {
            tracing::warn!("Word catalog is empty, dealing a placeholder pair");
            pair("Divers", "Chaise", "Tabouret", Difficulty::Facile)
        }
    }
}

fn pair(category: &str, civil: &str, imposter: &str, difficulty: Difficulty) -> WordPair {
    WordPair {
        civil: civil.to_string(),
        imposter: imposter.to_string(),
        category: category.to_string(),
        difficulty,
    }
}

fn builtin_pairs() -> Vec<WordPair> {
    vec![
    pair("Nourriture", "Pizza", "Tarte", Difficulty::Facile),
    pair("Nourriture", "Sushi", "Maki", Difficulty::Moyen),
    pair("Nourriture", "Croissant", "Pain au chocolat", Difficulty::Facile),
    pair("Nourriture", "Burger", "Sandwich", Difficulty::Facile),
    pair("Nourriture", "Salade", "Soupe", Difficulty::Moyen),
    pair("Nourriture", "Chocolat", "Caramel", Difficulty::Moyen),
    pair("Nourriture", "Fromage", "Beurre", Difficulty::Moyen),
    pair("Nourriture", "Pates", "Riz", Difficulty::Facile),
    pair("Nourriture", "Glace", "Sorbet", Difficulty::Difficile),
    pair("Nourriture", "Pomme", "Poire", Difficulty::Facile),
    pair("Nourriture", "Banane", "Plantain", Difficulty::Difficile),
    pair("Nourriture", "Fraise", "Framboise", Difficulty::Moyen),
    pair("Nourriture", "Orange", "Mandarine", Difficulty::Moyen),
    pair("Nourriture", "Citron", "Lime", Difficulty::Moyen),
    pair("Nourriture", "Tomate", "Poivron", Difficulty::Moyen),
    pair("Nourriture", "Concombre", "Courgette", Difficulty::Moyen),
    pair("Nourriture", "Oignon", "Ail", Difficulty::Moyen),
    pair("Nourriture", "Pomme de terre", "Patate douce", Difficulty::Moyen),
    pair("Nourriture", "Riz", "Quinoa", Difficulty::Difficile),
    pair("Nourriture", "Pates", "Nouilles", Difficulty::Facile),
    pair("Nourriture", "Cafe", "The", Difficulty::Facile),
    pair("Nourriture", "Vin", "Champagne", Difficulty::Moyen),
    pair("Nourriture", "Biere", "Cidre", Difficulty::Moyen),
    pair("Nourriture", "Kebab", "Taco", Difficulty::Moyen),
    pair("Nourriture", "Frites", "Chips", Difficulty::Facile),
    pair("Nourriture", "Coca", "Pepsi", Difficulty::Facile),
    pair("Animaux", "Chien", "Loup", Difficulty::Facile),
    pair("Animaux", "Chat", "Lynx", Difficulty::Moyen),
    pair("Animaux", "Dauphin", "Requin", Difficulty::Facile),
    pair("Animaux", "Aigle", "Faucon", Difficulty::Difficile),
    pair("Animaux", "Lion", "Tigre", Difficulty::Facile),
    pair("Animaux", "Ours", "Panda", Difficulty::Moyen),
    pair("Animaux", "Serpent", "Lezard", Difficulty::Moyen),
    pair("Animaux", "Cheval", "Ane", Difficulty::Moyen),
    pair("Animaux", "Poule", "Canard", Difficulty::Facile),
    pair("Animaux", "Mouche", "Moustique", Difficulty::Moyen),
    pair("Animaux", "Abeille", "Guepe", Difficulty::Moyen),
    pair("Animaux", "Papillon", "Mite", Difficulty::Difficile),
    pair("Animaux", "Singe", "Gorille", Difficulty::Moyen),
    pair("Lieux", "Plage", "Piscine", Difficulty::Moyen),
    pair("Lieux", "Montagne", "Colline", Difficulty::Facile),
    pair("Lieux", "Ecole", "Universite", Difficulty::Facile),
    pair("Lieux", "Restaurant", "Cafe", Difficulty::Facile),
    pair("Lieux", "Cinema", "Theatre", Difficulty::Facile),
    pair("Lieux", "Maison", "Appartement", Difficulty::Facile),
    pair("Lieux", "Hotel", "Motel", Difficulty::Moyen),
    pair("Lieux", "Forets", "Jungle", Difficulty::Moyen),
    pair("Lieux", "Desert", "Savane", Difficulty::Moyen),
    pair("Objets", "Telephone", "Tablette", Difficulty::Facile),
    pair("Objets", "Chaise", "Fauteuil", Difficulty::Facile),
    pair("Objets", "Table", "Bureau", Difficulty::Facile),
    pair("Objets", "Stylo", "Crayon", Difficulty::Facile),
    pair("Objets", "Fourchette", "Cuillere", Difficulty::Facile),
    pair("Objets", "Verre", "Tasse", Difficulty::Facile),
    pair("Objets", "Lampe", "Bougie", Difficulty::Moyen),
    pair("Objets", "Miroir", "Vitre", Difficulty::Difficile),
    pair("Metiers", "Medecin", "Infirmier", Difficulty::Moyen),
    pair("Metiers", "Policier", "Gendarme", Difficulty::Moyen),
    pair("Metiers", "Pompier", "Ambulancier", Difficulty::Moyen),
    pair("Metiers", "Boulanger", "Patissier", Difficulty::Moyen),
    pair("Metiers", "Coiffeur", "Barbier", Difficulty::Moyen),
    pair("Metiers", "Acteur", "Comedien", Difficulty::Facile),
    pair("Metiers", "Chanteur", "Musicien", Difficulty::Facile),
    pair("Sports", "Football", "Rugby", Difficulty::Facile),
    pair("Sports", "Tennis", "Badminton", Difficulty::Moyen),
    pair("Sports", "Basket", "Handball", Difficulty::Moyen),
    pair("Sports", "Ski", "Snowboard", Difficulty::Facile),
    pair("Sports", "Course", "Marche", Difficulty::Moyen),
    pair("Sports", "Natation", "Plongee", Difficulty::Moyen),
    pair("Technologie", "Ordinateur", "Tablette", Difficulty::Facile),
    pair("Technologie", "Wifi", "Bluetooth", Difficulty::Moyen),
    pair("Technologie", "Email", "SMS", Difficulty::Moyen),
    pair("Technologie", "Facebook", "Instagram", Difficulty::Facile),
    pair("Technologie", "Windows", "Mac", Difficulty::Facile),
    pair("Technologie", "iPhone", "Android", Difficulty::Facile),
    pair("Corps Humain", "Main", "Pied", Difficulty::Facile),
    pair("Corps Humain", "Oeil", "Oreille", Difficulty::Moyen),
    pair("Corps Humain", "Bouche", "Nez", Difficulty::Moyen),
    pair("Corps Humain", "Bras", "Jambe", Difficulty::Facile),
    pair("Corps Humain", "Cheveux", "Poils", Difficulty::Moyen),
    pair("Cinema", "Film", "Serie", Difficulty::Facile),
    pair("Cinema", "Acteur", "Figurant", Difficulty::Difficile),
    pair("Cinema", "Comedie", "Drame", Difficulty::Moyen),
    pair("Cinema", "Horreur", "Thriller", Difficulty::Moyen),
    pair("Couleurs", "Rouge", "Orange", Difficulty::Facile),
    pair("Couleurs", "Bleu", "Vert", Difficulty::Facile),
    pair("Couleurs", "Noir", "Gris", Difficulty::Facile),
    pair("Couleurs", "Jaune", "Or", Difficulty::Moyen),
    pair("Sentiments", "Joie", "Bonheur", Difficulty::Facile),
    pair("Sentiments", "Peur", "Angoisse", Difficulty::Moyen),
    pair("Sentiments", "Colere", "Haine", Difficulty::Moyen),
    pair("Sentiments", "Amour", "Amitie", Difficulty::Moyen),
    pair("Temps", "Jour", "Nuit", Difficulty::Facile),
    pair("Temps", "Matin", "Soir", Difficulty::Facile),
    pair("Temps", "Hier", "Demain", Difficulty::Facile),
    pair("Temps", "Minute", "Seconde", Difficulty::Moyen),
    ]
}
