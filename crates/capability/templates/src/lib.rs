//! 设备模板注册表。
//!
//! 进程启动时构建一次，之后只读。列表顺序即内置目录的声明顺序。

mod builtin;

use domain::DeviceTemplate;

/// 模板查询错误。
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown device template: {0}")]
    UnknownTemplate(String),
}

/// 模板注册表。
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<DeviceTemplate>,
}

impl TemplateRegistry {
    /// 由给定模板构建；同 id 的后者被忽略。
    pub fn new(templates: Vec<DeviceTemplate>) -> Self {
        let mut unique: Vec<DeviceTemplate> = Vec::with_capacity(templates.len());
        for template in templates {
            if unique.iter().all(|item| item.id != template.id) {
                unique.push(template);
            }
        }
        Self { templates: unique }
    }

    /// 内置目录。
    pub fn builtin() -> Self {
        Self::new(builtin::catalog())
    }

    pub fn get(&self, template_id: &str) -> Result<&DeviceTemplate, TemplateError> {
        self.templates
            .iter()
            .find(|template| template.id == template_id)
            .ok_or_else(|| TemplateError::UnknownTemplate(template_id.to_string()))
    }

    pub fn list(&self) -> &[DeviceTemplate] {
        &self.templates
    }
}
