//! Class ordering and member layouts
//!
//! Classes are compiled base-first so that a subclass can start from the
//! compiled members of its base. Layouts give the expression compiler the
//! inherited method arities before any body is compiled.

use lss_syntax::ClassDecl;
use osi_bytecode::{ClassInfo, OsiFile};
use rustc_hash::FxHashMap;

use crate::error::CompileError;

/// Members visible on a class, inherited ones included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassLayout {
    /// Class name
    pub name: String,
    /// Base class name
    pub superclass: Option<String>,
    /// Property names, inherited first
    pub properties: Vec<String>,
    /// Method name to parameter count
    pub methods: FxHashMap<String, u8>,
}

impl ClassLayout {
    /// Layout of a class already present in a container
    pub fn from_info(info: &ClassInfo, file: &OsiFile) -> Self {
        let properties = info
            .property_symbols
            .iter()
            .filter_map(|s| file.symbols.get(s.index()))
            .map(str::to_string)
            .collect();
        let methods = info
            .methods
            .iter()
            .filter_map(|m| {
                let name = file.symbols.get(m.name_symbol.index())?;
                Some((name.to_string(), m.parameter_count()))
            })
            .collect();
        Self {
            name: info.name.clone(),
            superclass: None,
            properties,
            methods,
        }
    }

    /// Layout of `decl` on top of its base layout
    pub fn derive(decl: &ClassDecl, base: Option<&ClassLayout>) -> Self {
        let mut layout = base.cloned().unwrap_or_default();
        layout.name = decl.name.text.clone();
        layout.superclass = decl.superclass.as_ref().map(|t| t.text.clone());
        for property in &decl.properties {
            if !layout.properties.contains(&property.text) {
                layout.properties.push(property.text.clone());
            }
        }
        for method in &decl.methods {
            layout
                .methods
                .insert(method.name.text.clone(), method.parameters.len().min(u8::MAX as usize) as u8);
        }
        layout
    }

    /// Parameter count of a method, inherited ones included
    pub fn method_arity(&self, name: &str) -> Option<u8> {
        self.methods.get(name).copied()
    }

    /// Constructor arity (a method named like the class)
    pub fn constructor_arity(&self) -> Option<u8> {
        self.method_arity(&self.name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
    Failed,
}

/// Order classes so every base precedes its subclasses
///
/// Returns indices into `classes` in compile order plus one error per broken
/// chain. Classes whose chain is broken are left out of the order.
pub fn order_classes(classes: &[&ClassDecl], existing: &OsiFile) -> (Vec<usize>, Vec<CompileError>) {
    let by_name: FxHashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.text.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; classes.len()];
    let mut order = Vec::with_capacity(classes.len());
    let mut errors = Vec::new();

    for start in 0..classes.len() {
        if let Err(err) = visit(start, classes, &by_name, existing, &mut marks, &mut order) {
            errors.extend(err);
        }
    }
    (order, errors)
}

fn visit(
    idx: usize,
    classes: &[&ClassDecl],
    by_name: &FxHashMap<&str, usize>,
    existing: &OsiFile,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) -> Result<(), Option<CompileError>> {
    match marks[idx] {
        Mark::Done => return Ok(()),
        // already reported
        Mark::Failed => return Err(None),
        Mark::Visiting => {
            let class = classes[idx];
            return Err(Some(CompileError::InheritanceCycle {
                name: class.name.text.clone(),
                span: class.name.span.clone(),
            }));
        }
        Mark::Unvisited => {}
    }

    marks[idx] = Mark::Visiting;
    let class = classes[idx];
    let result = match &class.superclass {
        None => Ok(()),
        Some(base) => match by_name.get(base.text.as_str()) {
            Some(&base_idx) => visit(base_idx, classes, by_name, existing, marks, order),
            None if existing.find_class(&base.text).is_some() => Ok(()),
            None => Err(Some(CompileError::undefined_class(&base.text, base.span.clone()))),
        },
    };

    match result {
        Ok(()) => {
            marks[idx] = Mark::Done;
            order.push(idx);
            Ok(())
        }
        Err(err) => {
            marks[idx] = Mark::Failed;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lss_syntax::Token;

    fn class(name: &str, base: Option<&str>) -> ClassDecl {
        ClassDecl {
            name: Token::identifier(name),
            superclass: base.map(Token::identifier),
            properties: vec![],
            methods: vec![],
        }
    }

    #[test]
    fn test_bases_come_first() {
        let c = class("C", Some("B"));
        let b = class("B", Some("A"));
        let a = class("A", None);
        let (order, errors) = order_classes(&[&c, &b, &a], &OsiFile::default());
        assert!(errors.is_empty());
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_cycle_reported_once() {
        let a = class("A", Some("B"));
        let b = class("B", Some("A"));
        let (order, errors) = order_classes(&[&a, &b], &OsiFile::default());
        assert!(order.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CompileError::InheritanceCycle { .. }));
    }

    #[test]
    fn test_unknown_base() {
        let a = class("A", Some("Missing"));
        let (_, errors) = order_classes(&[&a], &OsiFile::default());
        assert!(matches!(&errors[0], CompileError::UndefinedClass { name, .. } if name == "Missing"));
    }

    #[test]
    fn test_base_from_existing_file() {
        let mut file = OsiFile::default();
        file.classes.push(ClassInfo::new("Actor"));
        let a = class("Player", Some("Actor"));
        let (order, errors) = order_classes(&[&a], &file);
        assert!(errors.is_empty());
        assert_eq!(order, vec![0]);
    }

    #[test]
    fn test_derived_layout_overrides() {
        let mut base = class("A", None);
        base.properties.push(Token::identifier("x"));
        let base_layout = ClassLayout::derive(&base, None);

        let mut sub = class("B", Some("A"));
        sub.properties.push(Token::identifier("x"));
        sub.properties.push(Token::identifier("y"));
        let layout = ClassLayout::derive(&sub, Some(&base_layout));
        assert_eq!(layout.properties, vec!["x", "y"]);
        assert_eq!(layout.superclass.as_deref(), Some("A"));
    }
}
