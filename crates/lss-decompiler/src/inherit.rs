//! Superclass inference
//!
//! A container only stores flattened classes: every class repeats the
//! properties and methods it inherited. The base class is recovered as the
//! largest other class whose members are all present in this one.

use osi_bytecode::{ClassInfo, OsiFile, SymbolIndex};
use rustc_hash::FxHashSet;

/// Inferred shape of one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassShape {
    /// Index of the inferred base class
    pub superclass: Option<usize>,
    /// Properties declared by the class itself
    pub properties: Vec<SymbolIndex>,
    /// Indices (into the class's method table) of methods it declares or overrides
    pub methods: Vec<usize>,
}

struct Members {
    properties: FxHashSet<SymbolIndex>,
    methods: FxHashSet<SymbolIndex>,
}

impl Members {
    fn of(class: &ClassInfo) -> Self {
        Self {
            properties: class.property_symbols.iter().copied().collect(),
            methods: class.methods.iter().map(|m| m.name_symbol).collect(),
        }
    }

    fn count(&self) -> usize {
        self.properties.len() + self.methods.len()
    }

    fn is_subset(&self, other: &Members) -> bool {
        self.properties.is_subset(&other.properties) && self.methods.is_subset(&other.methods)
    }
}

/// Infer the base class of every class in the container
pub fn infer_hierarchy(file: &OsiFile) -> Vec<ClassShape> {
    let members: Vec<Members> = file.classes.iter().map(Members::of).collect();

    file.classes
        .iter()
        .enumerate()
        .map(|(a, class)| {
            let superclass = superclass_of(a, &members);
            let Some(base) = superclass else {
                return ClassShape {
                    superclass,
                    properties: class.property_symbols.clone(),
                    methods: (0..class.methods.len()).collect(),
                };
            };

            let base_class = &file.classes[base];
            let properties = class
                .property_symbols
                .iter()
                .copied()
                .filter(|p| !base_class.has_property(*p))
                .collect();
            let methods = class
                .methods
                .iter()
                .enumerate()
                .filter(|(_, m)| {
                    base_class
                        .method(m.name_symbol)
                        .is_none_or(|inherited| inherited.instructions != m.instructions)
                })
                .map(|(i, _)| i)
                .collect();
            ClassShape {
                superclass,
                properties,
                methods,
            }
        })
        .collect()
}

fn superclass_of(a: usize, members: &[Members]) -> Option<usize> {
    let own = &members[a];
    let mut best: Option<usize> = None;
    for (b, candidate) in members.iter().enumerate() {
        if b == a || candidate.count() == 0 || !candidate.is_subset(own) {
            continue;
        }
        // equal member sets: the earlier class is the base
        if candidate.count() == own.count() && b > a {
            continue;
        }
        if best.is_none_or(|current| candidate.count() > members[current].count()) {
            best = Some(b);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use osi_bytecode::{Instruction, MethodInfo};

    fn class(name: &str, properties: &[u16], methods: &[(u16, Instruction)]) -> ClassInfo {
        let mut class = ClassInfo::new(name);
        class.property_symbols = properties.iter().map(|&p| SymbolIndex(p)).collect();
        class.methods = methods
            .iter()
            .map(|(s, i)| MethodInfo::new(SymbolIndex(*s), vec![i.clone(), Instruction::Return]))
            .collect();
        class
    }

    #[test]
    fn test_largest_subset_wins() {
        let mut file = OsiFile::default();
        file.classes.push(class("Shape", &[0], &[]));
        file.classes.push(class("Circle", &[0, 1], &[(5, Instruction::PushZero)]));
        file.classes.push(class("Ring", &[0, 1, 2], &[(5, Instruction::PushZero)]));
        let shapes = infer_hierarchy(&file);
        assert_eq!(shapes[0].superclass, None);
        assert_eq!(shapes[1].superclass, Some(0));
        assert_eq!(shapes[2].superclass, Some(1));
        assert_eq!(shapes[2].properties, vec![SymbolIndex(2)]);
        assert!(shapes[2].methods.is_empty());
    }

    #[test]
    fn test_override_kept() {
        let mut file = OsiFile::default();
        file.classes.push(class("A", &[], &[(1, Instruction::PushZero)]));
        file.classes.push(class("B", &[], &[(1, Instruction::PushTrue)]));
        let shapes = infer_hierarchy(&file);
        assert_eq!(shapes[1].superclass, Some(0));
        assert_eq!(shapes[1].methods, vec![0]);
    }

    #[test]
    fn test_identical_classes_do_not_cycle() {
        let mut file = OsiFile::default();
        file.classes.push(class("A", &[3], &[]));
        file.classes.push(class("B", &[3], &[]));
        let shapes = infer_hierarchy(&file);
        assert_eq!(shapes[0].superclass, None);
        assert_eq!(shapes[1].superclass, Some(0));
    }

    #[test]
    fn test_empty_class_is_never_a_base() {
        let mut file = OsiFile::default();
        file.classes.push(class("Empty", &[], &[]));
        file.classes.push(class("Point", &[0, 1], &[]));
        let shapes = infer_hierarchy(&file);
        assert_eq!(shapes[1].superclass, None);
    }
}
