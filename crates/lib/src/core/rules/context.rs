use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use sqruff_lib_core::parser::segments::base::ErasedSegment;
use sqruff_lib_core::templaters::TemplatedFile;

use crate::core::config::FluffConfig;

/// Everything a rule needs to evaluate one segment: the segment itself,
/// its ancestry, and scratch memory that survives across calls within a
/// single crawl (e.g. to track state between siblings).
#[derive(Clone)]
pub struct RuleContext<'a> {
    data: Rc<RuleContextData<'a>>,
}

#[derive(Clone)]
pub struct RuleContextData<'a> {
    pub templated_file: Option<&'a TemplatedFile>,
    pub path: Option<String>,
    pub config: &'a FluffConfig,

    pub segment: ErasedSegment,
    /// Path from the root to this segment, root first.
    pub parent_stack: Vec<ErasedSegment>,
    /// memory: arbitrary storage a rule can use across invocations in one crawl.
    pub memory: Rc<RefCell<AHashMap<TypeId, Box<dyn Any>>>>,
    /// Index of this segment amongst its immediate siblings.
    pub segment_idx: usize,
}

impl<'a> std::ops::Deref for RuleContext<'a> {
    type Target = RuleContextData<'a>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl std::ops::DerefMut for RuleContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        Rc::make_mut(&mut self.data)
    }
}

impl<'a> RuleContext<'a> {
    pub fn new(config: &'a FluffConfig, segment: ErasedSegment) -> Self {
        Self {
            data: RuleContextData {
                templated_file: None,
                path: None,
                config,
                segment,
                parent_stack: Vec::new(),
                memory: Rc::new(RefCell::new(AHashMap::new())),
                segment_idx: 0,
            }
            .into(),
        }
    }

    pub fn try_get<T: Clone + 'static>(&self) -> Option<T> {
        let id = TypeId::of::<T>();

        let memory = self.memory.borrow();
        let value = memory.get(&id)?;
        let value = value.downcast_ref::<T>()?;

        Some(value.clone())
    }

    pub fn set<T: 'static>(&self, value: T) {
        let id = TypeId::of::<T>();
        self.memory.borrow_mut().insert(id, Box::new(value));
    }

    pub fn siblings_post(&self) -> Vec<ErasedSegment> {
        if let Some(parent) = self.parent_stack.last() {
            parent.segments()[self.segment_idx + 1..].to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn siblings_pre(&self) -> Vec<ErasedSegment> {
        if let Some(parent) = self.parent_stack.last() {
            parent.segments()[..self.segment_idx].to_vec()
        } else {
            Vec::new()
        }
    }
}
